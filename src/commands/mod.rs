//! Command handling module.
//!
//! Processes user commands sent to the bot via Telegram messages:
//! `/filter <city> <min> <max>`, `/start` and `/help`.

mod handler;
mod reply;
mod types;

pub use handler::CommandHandler;
pub use reply::Replier;
pub use types::{
    BotCommand, CommandResult, FilterArgsError, GREETING, NOTHING_FOUND, parse_filter_args,
    searching_message,
};
