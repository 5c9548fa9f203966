//! Transport error types

use std::time::Duration;

/// Errors that can occur while talking to the leaderboard server.
///
/// None of these are fatal to a page: the poller drops the tick and the
/// identity check falls back to the logged-out label.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Non-200 response.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Network error during the request.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request did not complete within the configured timeout.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Creates a new HTTP error.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Returns the HTTP status code if this is an HTTP error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
