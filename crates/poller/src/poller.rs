use std::time::Duration;

use devman_common::types::{PollOutcome, PollState, Timestamp};
use devman_notifier::MessageSender;
use devman_notifier::alerts::AlertDispatcher;
use devman_notifier::review::ReviewNotifier;

use crate::client::{PollError, ReviewSource};

/// What the loop does after an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Issue the next request right away.
    Immediately,
    /// Wait the retry cooldown first.
    Cooldown,
}

/// Long-poll loop: owns the resumption cursor and turns reviewed attempts
/// into notifications.
///
/// One request in flight at a time. Notifications for a batch are sent, in
/// server order, before the next request is issued.
pub struct PollLoop<R, M> {
    source: R,
    notifier: ReviewNotifier<M>,
    alerts: Option<AlertDispatcher<M>>,
    state: PollState,
    retry_cooldown: Duration,
}

impl<R: ReviewSource, M: MessageSender> PollLoop<R, M> {
    pub fn new(source: R, notifier: ReviewNotifier<M>, retry_cooldown: Duration) -> Self {
        Self {
            source,
            notifier,
            alerts: None,
            state: PollState::new(),
            retry_cooldown,
        }
    }

    /// Deliver queued operational alerts after every iteration.
    pub fn with_alerts(mut self, alerts: AlertDispatcher<M>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Current resumption cursor.
    pub fn cursor(&self) -> Option<&Timestamp> {
        self.state.timestamp()
    }

    /// Run forever. Only returns when the surrounding task is dropped.
    pub async fn run(&mut self) {
        tracing::info!(
            retry_cooldown_secs = self.retry_cooldown.as_secs(),
            "Review poller started"
        );

        loop {
            self.step().await;
        }
    }

    /// One full iteration: poll, deliver alerts, then wait if the outcome asks for it.
    pub async fn step(&mut self) -> Next {
        let next = self.poll_once().await;

        if let Some(alerts) = self.alerts.as_mut() {
            alerts.flush().await;
        }

        if next == Next::Cooldown {
            tokio::time::sleep(self.retry_cooldown).await;
        }
        next
    }

    /// Issue one request and act on its outcome. Never fails: every error is
    /// logged and turned into a retry decision, with the cursor untouched.
    pub async fn poll_once(&mut self) -> Next {
        let cursor = self.state.timestamp().cloned();
        tracing::debug!(
            timestamp = %cursor_label(cursor.as_ref()),
            "Requesting review updates"
        );

        match self.source.poll(cursor.as_ref()).await {
            Ok(outcome) => self.handle_outcome(outcome).await,
            Err(PollError::ReadTimeout) => {
                tracing::info!("Long poll outlived the client timeout, polling again");
                Next::Immediately
            }
            Err(PollError::Status(status)) => {
                tracing::warn!(
                    status = status.as_u16(),
                    "Review service answered with an error status, retrying after cooldown"
                );
                Next::Cooldown
            }
            Err(PollError::Connection(e)) => {
                tracing::warn!(
                    error = %e,
                    "Connection to review service failed, retrying after cooldown"
                );
                Next::Cooldown
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    timestamp = %cursor_label(cursor.as_ref()),
                    "Poll iteration failed"
                );
                Next::Cooldown
            }
        }
    }

    async fn handle_outcome(&mut self, outcome: PollOutcome) -> Next {
        match outcome {
            PollOutcome::Timeout { next_timestamp } => {
                tracing::debug!(timestamp = %next_timestamp, "No new reviews");
                self.advance(next_timestamp);
                Next::Immediately
            }
            PollOutcome::Found {
                next_timestamp,
                attempts,
            } => {
                tracing::info!(
                    timestamp = %next_timestamp,
                    attempts = attempts.len(),
                    "New reviews found"
                );
                self.advance(next_timestamp);

                for attempt in &attempts {
                    if let Err(e) = self.notifier.notify(attempt).await {
                        tracing::error!(
                            lesson = %attempt.lesson_title,
                            error = %e,
                            "Failed to send review notification"
                        );
                    }
                }
                Next::Immediately
            }
            PollOutcome::Unexpected { raw_payload } => {
                tracing::warn!(
                    payload = %raw_payload,
                    "Unrecognised response from review service, cursor kept"
                );
                Next::Cooldown
            }
        }
    }

    fn advance(&mut self, next: Timestamp) {
        if let Some(previous) = self.state.advance(next) {
            tracing::warn!(
                previous = %previous,
                current = %cursor_label(self.state.timestamp()),
                "Review service moved the cursor backwards"
            );
        }
    }
}

fn cursor_label(timestamp: Option<&Timestamp>) -> String {
    timestamp.map_or_else(|| "none".to_string(), ToString::to_string)
}
