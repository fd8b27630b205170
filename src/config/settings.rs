//! Bot transport configuration and listing search settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Port the webhook listener binds to when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Telegram transport configuration.
///
/// Built once at startup and handed to the transport bootstrap; request
/// handling never reads the environment.
#[derive(Clone)]
pub struct BotConfig {
    /// Bot API token issued by `@BotFather`.
    pub token: String,

    /// Port the webhook listener binds to.
    pub port: u16,

    /// Public base URL Telegram pushes updates to. `None` means long polling.
    pub webhook_url: Option<String>,

    /// Secret echoed by Telegram in `X-Telegram-Bot-Api-Secret-Token`.
    pub webhook_secret: Option<String>,
}

impl BotConfig {
    /// Creates a polling configuration with the given token.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            port: DEFAULT_PORT,
            webhook_url: None,
            webhook_secret: None,
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `BOT_TOKEN` to be set. `PORT`, `WEBHOOK_URL` and
    /// `WEBHOOK_SECRET` are optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or the port is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingEnvVar("BOT_TOKEN"))?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            token: token.trim().to_owned(),
            port,
            webhook_url: non_empty_var("WEBHOOK_URL").map(|u| u.trim_end_matches('/').to_owned()),
            webhook_secret: non_empty_var("WEBHOOK_SECRET"),
        })
    }

    /// Path segment the webhook is served under.
    #[must_use]
    pub fn webhook_path(&self) -> String {
        format!("/{}", self.token)
    }

    /// Full callback URL registered with Telegram, if webhook mode is configured.
    #[must_use]
    pub fn callback_url(&self) -> Option<String> {
        self.webhook_url
            .as_ref()
            .map(|base| format!("{base}{}", self.webhook_path()))
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &mask_token(&self.token))
            .field("port", &self.port)
            .field("webhook_url", &self.webhook_url)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Listing search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Listing site root; also the prefix for relative listing links.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with every search request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a single search request in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum number of listings replied per command.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_base_url() -> String {
    "https://www.immowelt.de".to_owned()
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_owned()
}

const fn default_timeout() -> u64 {
    15
}

const fn default_max_results() -> usize {
    5
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            max_results: default_max_results(),
        }
    }
}

impl SearchSettings {
    /// Creates search settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            base_url: non_empty_var("SEARCH_BASE_URL")
                .map_or_else(default_base_url, |u| u.trim_end_matches('/').to_owned()),
            user_agent: non_empty_var("SEARCH_USER_AGENT").unwrap_or_else(default_user_agent),
            timeout_secs: std::env::var("SEARCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .filter(|&secs| secs > 0)
                .unwrap_or_else(default_timeout),
            max_results: std::env::var("MAX_RESULTS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or_else(default_max_results),
        }
    }

    /// Returns settings pointing at a different site root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Masks a bot token for logging (keeps the numeric bot id only).
#[must_use]
pub fn mask_token(token: &str) -> String {
    match token.split_once(':') {
        Some((bot_id, _)) if !bot_id.is_empty() => format!("{bot_id}:***"),
        _ => "***".to_owned(),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid PORT value '{0}' (must be an integer between 0 and 65535)")]
    InvalidPort(String),
}
