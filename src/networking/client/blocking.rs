//! Blocking HTTP transport backed by reqwest

use super::{Transport, TransportResponse};
use crate::config::Config;
use crate::errors::DomLiteError;
use crate::networking::ajax::AjaxRequest;
use log::debug;
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use url::Url;

/// Create a configured HTTP client
///
/// # Arguments
/// * `config` - user agent, timeout and cookie settings
///
/// # Example
/// ```no_run
/// use domlite::Config;
/// use domlite::networking::create_client;
/// let client = create_client(&Config::default()).expect("Failed to create client");
/// ```
pub fn create_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .cookie_store(config.cookie_store)
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
}

/// [`Transport`] that performs real HTTP requests
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Option<Url>,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, DomLiteError> {
        let base_url = config.base_url.as_deref().map(Url::parse).transpose()?;
        Ok(Self {
            client: create_client(config)?,
            base_url,
        })
    }

    /// Turn a request URL into an absolute one, joining relative URLs onto the base
    pub fn resolve(&self, url: &str) -> Result<Url, DomLiteError> {
        match Url::parse(url) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => Ok(base.join(url)?),
                None => Err(DomLiteError::UrlError(
                    url::ParseError::RelativeUrlWithoutBase,
                )),
            },
            Err(err) => Err(err.into()),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &AjaxRequest) -> Result<TransportResponse, DomLiteError> {
        let url = self.resolve(&request.url)?;
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            DomLiteError::GenericError(format!("invalid HTTP method {:?}", request.method))
        })?;
        debug!("Did request to {} {}", method, url);

        let mut builder = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, request.content_type.as_str());
        if let Some(body) = request.body() {
            builder = builder.body(body);
        }
        let response = builder.send()?;
        let status = response.status().as_u16();
        debug!("{}", response.status());
        Ok(TransportResponse {
            status,
            body: response.text()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base_url: Option<&str>) -> HttpTransport {
        HttpTransport::new(&Config {
            base_url: base_url.map(str::to_string),
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn relative_urls_join_onto_base() {
        let http = transport(Some("http://localhost:8080/api/"));
        assert_eq!(
            http.resolve("items?q=1").unwrap().as_str(),
            "http://localhost:8080/api/items?q=1"
        );
        assert_eq!(
            http.resolve("/x").unwrap().as_str(),
            "http://localhost:8080/x"
        );
        assert_eq!(
            http.resolve("https://example.com/y").unwrap().as_str(),
            "https://example.com/y"
        );
    }

    #[test]
    fn relative_url_without_base_is_an_error() {
        assert!(matches!(
            transport(None).resolve("/x"),
            Err(DomLiteError::UrlError(url::ParseError::RelativeUrlWithoutBase))
        ));
    }

    #[test]
    fn bad_base_url_fails_construction() {
        assert!(matches!(
            HttpTransport::new(&Config {
                base_url: Some("not a url".into()),
                ..Config::default()
            }),
            Err(DomLiteError::UrlError(_))
        ));
    }
}
