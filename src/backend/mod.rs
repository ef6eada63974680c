//! HTTP clients for the recognizer / registry service.
//!
//! One service hosts all three collaborators:
//!
//! | Collaborator  | Endpoint                         |
//! |---------------|----------------------------------|
//! | Recognizer    | `POST /analyze` (multipart)      |
//! | Registry      | `GET/POST /api/vehicles`, `PUT/DELETE /api/vehicles/{id}` |
//! | Activity log  | `GET/POST /api/history`          |
//!
//! An empty base URL addresses the service relative to the current
//! origin, which only works behind a proxy; native callers should always
//! configure one.

mod analyze;
mod history;
mod vehicles;

pub use analyze::{parse_analysis, AnalysisResponse, HttpRecognizer};
pub use history::HttpActivityLog;
pub use vehicles::HttpRegistry;

use std::time::Duration;
use thiserror::Error;

/// Errors raised while setting up a backend client.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("invalid base URL '{0}'")]
    InvalidUrl(String),
}

/// Shared HTTP client bound to one service base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Creates a client whose requests give up after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !base_url.is_empty() && !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path`, which must start with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = BackendClient::new("http://plates.local:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://plates.local:8000");
        assert_eq!(client.url("/analyze"), "http://plates.local:8000/analyze");
    }

    #[test]
    fn test_relative_base_allowed() {
        let client = BackendClient::new("", Duration::from_secs(5)).unwrap();
        assert_eq!(client.url("/api/vehicles"), "/api/vehicles");
    }

    #[test]
    fn test_rejects_non_http_base() {
        assert!(matches!(
            BackendClient::new("ftp://plates.local", Duration::from_secs(5)),
            Err(BackendError::InvalidUrl(_))
        ));
    }
}
