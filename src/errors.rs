use thiserror::Error;
#[derive(Error, Debug)]
pub enum DomLiteError {
    #[error("Selector error: {0}")]
    SelectorError(String),
    #[error("invalid token: {0:?}")]
    InvalidToken(String),
    #[error("invalid attribute name: {0:?}")]
    InvalidAttributeName(String),
    #[error("regex error: {0}")]
    RegexError(String),
    #[error("serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("url error: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("{0}")]
    GenericError(String),
}

pub type Result<T> = std::result::Result<T, DomLiteError>;
