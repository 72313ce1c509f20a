//! Outbound delivery to the chat service.
//!
//! - [`telegram`]: the Bot API client behind the [`MessageSender`] capability
//! - [`review`]: renders reviewed attempts into user-facing notifications
//! - [`alerts`]: forwards warning/error diagnostics to an alert chat

pub mod alerts;
pub mod error;
pub mod review;
pub mod telegram;

use async_trait::async_trait;

pub use error::SendError;

/// Capability to deliver one plain-text message to a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), SendError>;
}

#[async_trait]
impl<T: MessageSender + ?Sized> MessageSender for std::sync::Arc<T> {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), SendError> {
        (**self).send(chat_id, text).await
    }
}
