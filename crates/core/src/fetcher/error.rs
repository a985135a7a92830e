//! Error types for the fetcher module.

use thiserror::Error;

/// Errors that can occur while fetching a catalog.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure, including timeouts.
    #[error("Network unavailable: {0}")]
    Network(String),

    /// The remote resource or local file does not exist.
    #[error("Catalog not found: {0}")]
    NotFound(String),

    /// Payload could not be parsed.
    #[error("Malformed catalog payload: {0}")]
    Malformed(String),

    /// Remote answered with a non-success status other than 404.
    #[error("HTTP error {status} for {url}")]
    Http { status: u16, url: String },

    /// Reading a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Classify a transport error.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(err.to_string())
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.url().map(|u| u.as_str()).unwrap_or(""))
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Map a non-success status code.
    pub(crate) fn from_status(status: u16, url: &str) -> Self {
        if status == 404 {
            Self::NotFound(url.to_string())
        } else {
            Self::Http {
                status,
                url: url.to_string(),
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
