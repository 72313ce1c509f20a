//! Operational alerts: forwards warning/error diagnostics to a chat.
//!
//! [`AlertLayer`] is a `tracing` layer attached next to the console and file
//! sinks. It never performs I/O itself: qualifying events are rendered and
//! queued on an unbounded channel. [`AlertDispatcher`] drains that queue and
//! delivers each alert through a [`MessageSender`] when the poll loop calls
//! [`AlertDispatcher::flush`].
//!
//! Events emitted under [`ALERT_TARGET`] are never forwarded, and neither is
//! anything emitted while the dispatcher is sending (HTTP client internals,
//! delivery failures). Those only reach the local sinks. `flush` sends what
//! was queued when it started, so it always terminates.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::MessageSender;

/// Target used for the alert path's own diagnostics.
pub const ALERT_TARGET: &str = "devman_notifier::alerts";

/// Telegram rejects longer texts.
const MAX_ALERT_CHARS: usize = 4096;

/// One rendered diagnostic waiting for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: Level,
    pub text: String,
}

/// Receiving half of the alert queue.
pub struct AlertReceiver {
    rx: mpsc::UnboundedReceiver<Alert>,
    delivering: Arc<AtomicBool>,
}

impl AlertReceiver {
    /// Take every alert queued so far.
    pub fn drain(&mut self) -> Vec<Alert> {
        let mut alerts = Vec::new();
        while let Ok(alert) = self.rx.try_recv() {
            alerts.push(alert);
        }
        alerts
    }
}

/// Marks a delivery in progress; cleared on drop, including cancellation.
struct DeliveryGuard(Arc<AtomicBool>);

impl DeliveryGuard {
    fn enter(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag.clone())
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Tracing layer that queues events at or above a severity threshold.
pub struct AlertLayer {
    threshold: Level,
    tx: mpsc::UnboundedSender<Alert>,
    delivering: Arc<AtomicBool>,
}

impl AlertLayer {
    /// Create the layer and the receiving half of its queue.
    pub fn new(threshold: Level) -> (Self, AlertReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let delivering = Arc::new(AtomicBool::new(false));
        (
            Self {
                threshold,
                tx,
                delivering: delivering.clone(),
            },
            AlertReceiver { rx, delivering },
        )
    }
}

impl<S: Subscriber> Layer<S> for AlertLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        // `Level` orders ERROR lowest, so "at or above" severity is `<=`.
        if *meta.level() > self.threshold
            || meta.target().starts_with(ALERT_TARGET)
            || self.delivering.load(Ordering::SeqCst)
        {
            return;
        }

        let mut visitor = AlertVisitor::default();
        event.record(&mut visitor);

        let text = render_alert(*meta.level(), meta.target(), &visitor.message, &visitor.fields);
        // Receiver gone means the process is shutting down.
        let _ = self.tx.send(Alert {
            level: *meta.level(),
            text,
        });
    }
}

#[derive(Default)]
struct AlertVisitor {
    message: String,
    fields: String,
}

impl Visit for AlertVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

fn render_alert(level: Level, target: &str, message: &str, fields: &str) -> String {
    let text = format!(
        "{} {} {}: {}{}",
        level,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        target,
        message,
        fields
    );
    truncate_chars(text, MAX_ALERT_CHARS)
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

/// Delivers queued alerts to the alert chat.
pub struct AlertDispatcher<M> {
    rx: AlertReceiver,
    sender: M,
    chat_id: String,
}

impl<M: MessageSender> AlertDispatcher<M> {
    pub fn new(rx: AlertReceiver, sender: M, chat_id: impl Into<String>) -> Self {
        Self {
            rx,
            sender,
            chat_id: chat_id.into(),
        }
    }

    /// Send everything currently queued, in emission order.
    ///
    /// Failed deliveries are logged under [`ALERT_TARGET`] and dropped.
    /// Returns the number of alerts delivered.
    pub async fn flush(&mut self) -> usize {
        let pending = self.rx.drain();
        if pending.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        for alert in pending {
            let sent = {
                let _guard = DeliveryGuard::enter(&self.rx.delivering);
                self.sender.send(&self.chat_id, &alert.text).await
            };
            match sent {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::error!(
                        target: ALERT_TARGET,
                        level = %alert.level,
                        error = %e,
                        "Failed to deliver operational alert"
                    );
                }
            }
        }
        delivered
    }
}
