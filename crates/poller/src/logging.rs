use std::fs::OpenOptions;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use devman_common::config::AppConfig;
use devman_notifier::alerts::{AlertLayer, AlertReceiver};

const DEFAULT_FILTER: &str = "devman_poller=debug,devman_notifier=info,devman_common=info";

/// Keeps the file writer flushing until dropped.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Install the process-wide sinks: console, log file and alert queue.
///
/// Returns the receiving half of the alert queue; hand it to an
/// `AlertDispatcher` or alerts accumulate unsent.
pub fn init_tracing(config: &AppConfig) -> anyhow::Result<(LoggingGuard, AlertReceiver)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("failed to open log file {}", config.log_file.display()))?;
    let (file_writer, file_guard) = tracing_appender::non_blocking(file);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter());

    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(env_filter());

    let (alert_layer, alerts) = AlertLayer::new(config.alert_level);
    let alert_layer = alert_layer.with_filter(LevelFilter::from_level(config.alert_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(alert_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    tracing::info!(
        log_file = %config.log_file.display(),
        alert_level = %config.alert_level,
        "Logging initialized"
    );

    Ok((
        LoggingGuard {
            _file_guard: file_guard,
        },
        alerts,
    ))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}
