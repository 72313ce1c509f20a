//! Telegram Bot API client (`sendMessage`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;

use crate::{MessageSender, SendError};

/// Bot API reply envelope. Only the fields needed to detect rejection.
#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends plain-text messages through a Telegram bot. Never logs the token.
pub struct TelegramClient {
    api_url: String,
    token: String,
    client: Client,
}

impl TelegramClient {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        let client = http_client(timeout).build()?;
        Ok(Self::with_client(api_url, token, client))
    }

    /// Use a preconfigured HTTP client (proxy, timeouts).
    pub fn with_client(
        api_url: impl Into<String>,
        token: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }
}

fn http_client(timeout: Duration) -> ClientBuilder {
    Client::builder().timeout(timeout)
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), SendError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let res = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SendError::Status { status, body });
        }

        let reply: ApiReply = res.json().await?;
        if !reply.ok {
            return Err(SendError::Api {
                description: reply
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        Ok(())
    }
}
