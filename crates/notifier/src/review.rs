//! Review notifications: one chat message per reviewed attempt.

use devman_common::types::Attempt;

use crate::{MessageSender, SendError};

pub const APPROVED_LINE: &str = "Преподавателю всё понравилось, можно приступать к следующему уроку!";
pub const REJECTED_LINE: &str = "К сожалению, в работе нашлись ошибки.";

/// Render the notification text for one attempt.
///
/// `origin` is joined to `lesson_url` by plain concatenation.
pub fn render_message(attempt: &Attempt, origin: &str) -> String {
    let status = if attempt.is_negative {
        REJECTED_LINE
    } else {
        APPROVED_LINE
    };

    format!(
        "У вас проверили работу «{}»\n\n{}\n{}{}",
        attempt.lesson_title, status, origin, attempt.lesson_url
    )
}

/// Delivers review notifications to a fixed chat.
pub struct ReviewNotifier<M> {
    sender: M,
    chat_id: String,
    origin: String,
}

impl<M: MessageSender> ReviewNotifier<M> {
    pub fn new(sender: M, chat_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            sender,
            chat_id: chat_id.into(),
            origin: origin.into(),
        }
    }

    /// Send the notification for one attempt. Send failures are returned as-is.
    pub async fn notify(&self, attempt: &Attempt) -> Result<(), SendError> {
        let text = render_message(attempt, &self.origin);
        self.sender.send(&self.chat_id, &text).await?;

        tracing::info!(
            lesson = %attempt.lesson_title,
            is_negative = attempt.is_negative,
            "Review notification sent"
        );
        Ok(())
    }
}
