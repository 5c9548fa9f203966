//! HTTP client for the leaderboard server

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use url::Url;

use crate::codec::decode_uri;
use crate::error::TransportError;
use crate::identity::IdentityVerifier;
use crate::poller::ChangeSource;
use crate::poller::ChangeToken;

/// Client for the leaderboard's lightweight endpoints.
///
/// Cheap to clone (uses `Arc` internally).
///
/// # Example
///
/// ```ignore
/// use board_sync::BoardClient;
///
/// let client = BoardClient::builder()
///     .url(Url::parse("http://localhost:5000")?)
///     .timeout(Duration::from_millis(900))
///     .build()?;
///
/// let token = client.timestamp().await?;
/// ```
#[derive(Clone)]
pub struct BoardClient {
    inner: Arc<BoardClientInner>,
}

struct BoardClientInner {
    base_url: Url,
    http_client: Client,
    timeout: Option<Duration>,
}

impl BoardClient {
    /// Creates a new builder for constructing a client.
    pub fn builder() -> BoardClientBuilder<Missing> {
        BoardClientBuilder::new()
    }

    /// Returns the server's base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// `GET /timestamp`: the current data token.
    ///
    /// The body is decoded with [`decode_uri`], so escaped reserved
    /// characters stay escaped.
    pub async fn timestamp(&self) -> Result<ChangeToken, TransportError> {
        let body = self.get_text(&["timestamp"]).await?;
        Ok(ChangeToken::new(decode_uri(&body)))
    }

    /// `GET /verify/{user_id}/{user_key}`: `true` if the body is exactly `"true"`.
    pub async fn verify_user(&self, user_id: &str, user_key: &str) -> Result<bool, TransportError> {
        let body = self.get_text(&["verify", user_id, user_key]).await?;
        Ok(decode_uri(&body) == "true")
    }

    /// Builds an endpoint URL. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_text(&self, segments: &[&str]) -> Result<String, TransportError> {
        let url = self.endpoint(segments)?;
        let mut request = self.inner.http_client.get(url);

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;

        if response.status() == StatusCode::OK {
            response.text().await.map_err(|e| self.map_error(e))
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::http(status, body))
        }
    }

    fn map_error(&self, error: reqwest::Error) -> TransportError {
        match self.inner.timeout {
            Some(timeout) if error.is_timeout() => TransportError::Timeout(timeout),
            _ => TransportError::Network(error),
        }
    }
}

impl std::fmt::Debug for BoardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

#[async_trait]
impl ChangeSource for BoardClient {
    async fn fetch_token(&self) -> Result<ChangeToken, TransportError> {
        self.timestamp().await
    }
}

#[async_trait]
impl IdentityVerifier for BoardClient {
    async fn verify(&self, user_id: &str, user_key: &str) -> Result<bool, TransportError> {
        self.verify_user(user_id, user_key).await
    }
}

// =============================================================================
// Typestate Builder
// =============================================================================

/// Marker type for missing required builder fields.
pub struct Missing;

/// Marker type for set builder fields.
pub struct Set<T>(T);

/// Builder for constructing a [`BoardClient`].
///
/// The server URL is required and enforced at compile time.
pub struct BoardClientBuilder<U> {
    url: U,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl BoardClientBuilder<Missing> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: Missing,
            timeout: None,
            connect_timeout: None,
        }
    }

    /// Sets the leaderboard server URL.
    pub fn url(self, url: Url) -> BoardClientBuilder<Set<Url>> {
        BoardClientBuilder {
            url: Set(url),
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
        }
    }
}

impl Default for BoardClientBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> BoardClientBuilder<U> {
    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    ///
    /// This is applied when building the HTTP client.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

impl BoardClientBuilder<Set<Url>> {
    /// Builds the [`BoardClient`].
    pub fn build(self) -> Result<BoardClient, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(BoardClient {
            inner: Arc::new(BoardClientInner {
                base_url: self.url.0,
                http_client,
                timeout: self.timeout,
            }),
        })
    }
}
