use std::path::PathBuf;
use std::time::Duration;

use tracing::Level;

use crate::error::ConfigError;

/// Global application configuration loaded from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    /// Telegram bot token
    pub telegram_bot_token: String,

    /// Telegram Bot API base (default: https://api.telegram.org)
    pub telegram_api_url: String,

    /// Total timeout for one Bot API request (default: 30s)
    pub telegram_timeout: Duration,

    /// Chat receiving review notifications
    pub chat_id: String,

    /// Chat receiving operational alerts (default: same as `chat_id`)
    pub alert_chat_id: String,

    /// Review service API token
    pub devman_token: String,

    /// Long polling endpoint
    pub long_polling_url: String,

    /// Origin prepended to relative lesson URLs
    pub devman_origin: String,

    /// Client-side read timeout for one long poll (default: 900s)
    pub poll_client_timeout: Duration,

    /// Wait before retrying after a recoverable failure (default: 5s)
    pub retry_cooldown: Duration,

    /// File log sink path
    pub log_file: PathBuf,

    /// Minimum severity forwarded to the alert chat: WARN (default) or ERROR
    pub alert_level: Level,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let or_default = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let seconds = |name: &'static str, default: &str| {
            let raw = or_default(name, default);
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    name,
                    expected: "u64",
                    value: raw,
                })
        };

        let chat_id = required("CHAT_ID")?;
        let alert_level = or_default("ALERT_LEVEL", "warn");
        // Anything more verbose would forward the HTTP client's own chatter.
        let parsed_alert_level = alert_level
            .trim()
            .parse::<Level>()
            .ok()
            .filter(|level| *level <= Level::WARN)
            .ok_or_else(|| ConfigError::Invalid {
                name: "ALERT_LEVEL",
                expected: "error or warn",
                value: alert_level.clone(),
            })?;

        Ok(Self {
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            telegram_api_url: or_default("TELEGRAM_API_URL", "https://api.telegram.org"),
            telegram_timeout: seconds("TELEGRAM_TIMEOUT_SECS", "30")?,
            alert_chat_id: or_default("ALERT_CHAT_ID", &chat_id),
            chat_id,
            devman_token: required("DEVMAN_TOKEN")?,
            long_polling_url: or_default("LONG_POLLING_URL", "https://dvmn.org/api/long_polling/"),
            devman_origin: or_default("DEVMAN_ORIGIN", "https://dvmn.org"),
            poll_client_timeout: seconds("POLL_CLIENT_TIMEOUT_SECS", "900")?,
            retry_cooldown: seconds("POLL_RETRY_COOLDOWN_SECS", "5")?,
            log_file: PathBuf::from(or_default("LOG_FILE", "bot.log")),
            alert_level: parsed_alert_level,
        })
    }
}

// Credentials stay out of Debug output.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_api_url", &self.telegram_api_url)
            .field("telegram_timeout", &self.telegram_timeout)
            .field("chat_id", &self.chat_id)
            .field("alert_chat_id", &self.alert_chat_id)
            .field("devman_token", &"<redacted>")
            .field("long_polling_url", &self.long_polling_url)
            .field("devman_origin", &self.devman_origin)
            .field("poll_client_timeout", &self.poll_client_timeout)
            .field("retry_cooldown", &self.retry_cooldown)
            .field("log_file", &self.log_file)
            .field("alert_level", &self.alert_level)
            .finish()
    }
}
