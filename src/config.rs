//! Runtime configuration for the HTTP transport
use crate::errors::DomLiteError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Settings used to build the HTTP client behind [`crate::networking::HttpTransport`]
///
/// Every field is optional in the JSON form; missing fields take their defaults.
///
/// ```rust
/// use domlite::Config;
/// let config = Config::from_json_str(r#"{"base_url": "http://localhost:8080"}"#).unwrap();
/// assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080"));
/// assert_eq!(config.timeout_secs, 30);
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub user_agent: String,
    /// Base used to resolve relative request URLs
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub cookie_store: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: format!("domlite/{}", env!("CARGO_PKG_VERSION")),
            base_url: None,
            timeout_secs: 30,
            cookie_store: true,
        }
    }
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self, DomLiteError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomLiteError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(Config::from_json_str("{}").unwrap(), Config::default());
    }

    #[test]
    fn overrides_fields() {
        let config =
            Config::from_json_str(r#"{"user_agent": "test", "timeout_secs": 5, "cookie_store": false}"#)
                .unwrap();
        assert_eq!(config.user_agent, "test");
        assert_eq!(config.timeout_secs, 5);
        assert!(!config.cookie_store);
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn bad_input_is_an_error() {
        assert!(matches!(
            Config::from_json_str(r#"{"timeout_secs": "soon"}"#),
            Err(DomLiteError::SerdeError(_))
        ));
        assert!(matches!(
            Config::load("/nonexistent/domlite.json"),
            Err(DomLiteError::IoError(_))
        ));
    }
}
