use std::sync::Arc;

use devman_common::config::AppConfig;
use devman_notifier::alerts::AlertDispatcher;
use devman_notifier::review::ReviewNotifier;
use devman_notifier::telegram::TelegramClient;
use devman_poller::client::LongPollClient;
use devman_poller::logging::init_tracing;
use devman_poller::poller::PollLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize tracing (console, file, alert chat)
    let (_logging_guard, alert_queue) = init_tracing(&config)?;

    tracing::info!("Devman review notifier starting...");

    let telegram = Arc::new(TelegramClient::new(
        config.telegram_api_url.clone(),
        config.telegram_bot_token.clone(),
        config.telegram_timeout,
    )?);

    let source = LongPollClient::new(
        config.long_polling_url.clone(),
        config.devman_token.clone(),
        config.poll_client_timeout,
    )?;

    let notifier = ReviewNotifier::new(
        telegram.clone(),
        config.chat_id.clone(),
        config.devman_origin.clone(),
    );
    let alerts = AlertDispatcher::new(alert_queue, telegram, config.alert_chat_id.clone());

    let mut poller = PollLoop::new(source, notifier, config.retry_cooldown).with_alerts(alerts);

    // Run until Ctrl+C
    tokio::select! {
        _ = poller.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping...");
        }
    }

    tracing::info!("Devman review notifier stopped.");
    Ok(())
}
