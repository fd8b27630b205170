//! Telegram transport module.
//!
//! Provides the Bot API client, the webhook listener and the long-polling
//! fallback, and routes incoming updates to the command handler.

mod client;
mod dispatcher;
mod polling;
mod types;
pub mod webhook;

pub use client::{ALLOWED_UPDATES, DEFAULT_API_BASE, TelegramBot, TelegramError};
pub use dispatcher::{ChatReplier, UpdateDispatcher};
pub use polling::{POLL_TIMEOUT_SECS, UpdatePoller};
pub use types::{Chat, Message, Update, User};
pub use webhook::WebhookState;
