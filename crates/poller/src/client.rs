use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use devman_common::types::{PollOutcome, Timestamp};

/// Why a long-poll request produced no usable response.
#[derive(Debug, Error)]
pub enum PollError {
    /// The server answered with a non-2xx status.
    #[error("review service returned {0}")]
    Status(StatusCode),

    /// The server held the connection longer than the client waits. Expected.
    #[error("client-side read timeout")]
    ReadTimeout,

    /// DNS failure, refused or reset connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// The body was not valid JSON.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Anything reqwest reports that fits none of the above.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for PollError {
    fn from(err: reqwest::Error) -> Self {
        // A connect timeout is a connection failure, not a long-poll expiry.
        if err.is_connect() {
            PollError::Connection(err.to_string())
        } else if err.is_timeout() {
            PollError::ReadTimeout
        } else if let Some(status) = err.status() {
            PollError::Status(status)
        } else if err.is_decode() {
            PollError::Decode(err.to_string())
        } else {
            PollError::Request(err.to_string())
        }
    }
}

impl PollError {
    /// Whether the loop should wait before the next request.
    pub fn needs_cooldown(&self) -> bool {
        !matches!(self, PollError::ReadTimeout)
    }
}

/// Source of long-poll outcomes.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Issue one request resuming from `timestamp` (omitted when `None`).
    async fn poll(&self, timestamp: Option<&Timestamp>) -> Result<PollOutcome, PollError>;
}

/// HTTP client for the review service long-polling endpoint.
pub struct LongPollClient {
    url: String,
    token: String,
    client: Client,
}

impl LongPollClient {
    /// `read_timeout` should exceed the server's own hold time.
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        read_timeout: Duration,
    ) -> Result<Self, PollError> {
        let client = Client::builder().timeout(read_timeout).build()?;
        Ok(Self {
            url: url.into(),
            token: token.into(),
            client,
        })
    }
}

#[async_trait]
impl ReviewSource for LongPollClient {
    async fn poll(&self, timestamp: Option<&Timestamp>) -> Result<PollOutcome, PollError> {
        let mut request = self
            .client
            .get(&self.url)
            .header(AUTHORIZATION, format!("Token {}", self.token));
        if let Some(ts) = timestamp {
            request = request.query(&[("timestamp", ts.to_string())]);
        }

        let res = request.send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(PollError::Status(status));
        }

        let payload: serde_json::Value = res.json().await?;
        tracing::debug!(payload = %payload, "Long poll response");

        Ok(PollOutcome::from_json(payload))
    }
}
