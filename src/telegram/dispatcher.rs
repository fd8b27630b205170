//! Routes incoming updates to the command handler.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info_span};

use super::{TelegramBot, TelegramError, Update};
use crate::commands::{CommandHandler, Replier};

/// Replies into one Telegram chat.
#[derive(Debug, Clone)]
pub struct ChatReplier {
    bot: Arc<TelegramBot>,
    chat_id: i64,
}

impl ChatReplier {
    #[must_use]
    pub const fn new(bot: Arc<TelegramBot>, chat_id: i64) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl Replier for ChatReplier {
    async fn reply(&self, text: &str) -> Result<(), TelegramError> {
        self.bot.send_message(self.chat_id, text).await.map(|_| ())
    }
}

/// Hands each update to the command handler on its own task.
#[derive(Debug, Clone)]
pub struct UpdateDispatcher {
    bot: Arc<TelegramBot>,
    handler: Arc<CommandHandler>,
}

impl UpdateDispatcher {
    #[must_use]
    pub const fn new(bot: Arc<TelegramBot>, handler: Arc<CommandHandler>) -> Self {
        Self { bot, handler }
    }

    /// Spawns handling of `update`; commands from different updates run concurrently.
    pub fn spawn(&self, update: Update) -> JoinHandle<()> {
        let dispatcher = self.clone();
        let span = info_span!("update", update_id = update.update_id);
        tokio::spawn(async move { dispatcher.dispatch(update).await }.instrument(span))
    }

    /// Handles one update to completion. Failures are logged, never returned.
    pub async fn dispatch(&self, update: Update) {
        let Some((message, text)) = update.text_message() else {
            debug!("Ignoring update without text message");
            return;
        };

        let replier = ChatReplier::new(Arc::clone(&self.bot), message.chat.id);

        if let Err(e) = self.handler.try_handle(text, &replier).await {
            error!(chat_id = message.chat.id, "Failed to answer command: {}", e);
        }
    }
}
