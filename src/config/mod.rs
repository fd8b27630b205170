//! Configuration module for the flat filter bot.
//!
//! Handles loading of the Telegram transport configuration and the
//! listing search settings from the environment.

mod settings;

pub use settings::{BotConfig, ConfigError, DEFAULT_PORT, SearchSettings, mask_token};
