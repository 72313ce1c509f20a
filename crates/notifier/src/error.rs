use reqwest::StatusCode;
use thiserror::Error;

/// Failure to deliver a message through the chat service.
#[derive(Debug, Error)]
pub enum SendError {
    /// The request never produced a response. The URL is stripped because the
    /// Bot API embeds the token in it.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    #[error("chat API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("chat API rejected the message: {description}")]
    Api { description: String },
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        SendError::Transport(err.without_url())
    }
}
