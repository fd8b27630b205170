//! Command handler implementation.

use std::sync::Arc;

use tracing::{debug, info};

use super::Replier;
use super::types::{
    BotCommand, CommandResult, GREETING, NOTHING_FOUND, parse_filter_args, searching_message,
};
use crate::listings::ListingSource;
use crate::telegram::TelegramError;

/// Handles bot commands for one chat message at a time.
///
/// Holds no mutable state, so one handler serves concurrent commands.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// Where listings come from.
    source: Arc<dyn ListingSource>,

    /// Maximum number of listings replied per search.
    max_results: usize,

    /// The bot's own username, used to resolve `/cmd@bot` mentions.
    bot_username: Option<String>,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(source: Arc<dyn ListingSource>, max_results: usize) -> Self {
        Self {
            source,
            max_results,
            bot_username: None,
        }
    }

    /// Sets the bot's own username.
    #[must_use]
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Tries to parse and execute a command from a message.
    ///
    /// Returns `Ok(None)` if the message is not a command.
    ///
    /// # Errors
    ///
    /// Returns an error if a reply could not be delivered; the remaining
    /// replies of that command are not sent.
    pub async fn try_handle<R>(
        &self,
        message_text: &str,
        replier: &R,
    ) -> Result<Option<CommandResult>, TelegramError>
    where
        R: Replier + ?Sized,
    {
        let Some(command) = BotCommand::parse(message_text, self.bot_username.as_deref()) else {
            return Ok(None);
        };

        debug!("Handling command: {}", command);
        let result = self.execute(command, replier).await?;
        info!(
            "Command result: success={}, listings={}, replies={}",
            result.success, result.listings_found, result.replies_sent
        );

        Ok(Some(result))
    }

    /// Executes a parsed command.
    async fn execute<R>(&self, command: BotCommand, replier: &R) -> Result<CommandResult, TelegramError>
    where
        R: Replier + ?Sized,
    {
        match command {
            BotCommand::Start => {
                replier.reply(GREETING).await?;
                Ok(CommandResult::success(1))
            }
            BotCommand::Help => {
                replier.reply(&help_text()).await?;
                Ok(CommandResult::success(1))
            }
            BotCommand::Filter(args) => self.handle_filter(&args, replier).await,
        }
    }

    async fn handle_filter<R>(&self, args: &[String], replier: &R) -> Result<CommandResult, TelegramError>
    where
        R: Replier + ?Sized,
    {
        let filter = match parse_filter_args(args) {
            Ok(filter) => filter,
            Err(e) => {
                debug!("Rejected filter arguments {:?}: {}", args, e);
                replier.reply(&e.to_string()).await?;
                return Ok(CommandResult::error(1));
            }
        };

        replier.reply(&searching_message(&filter)).await?;
        let mut replies_sent = 1;

        let listings = self.source.search(&filter).await;

        if listings.is_empty() {
            replier.reply(NOTHING_FOUND).await?;
            return Ok(CommandResult::search(0, replies_sent + 1));
        }

        for listing in listings.iter().take(self.max_results) {
            replier.reply(&listing.to_string()).await?;
            replies_sent += 1;
        }

        Ok(CommandResult::search(listings.len(), replies_sent))
    }
}

fn help_text() -> String {
    let mut lines = vec!["Available commands:".to_owned()];
    for (usage, description) in BotCommand::all_commands() {
        lines.push(format!("  {usage} - {description}"));
    }
    lines.join("\n")
}
