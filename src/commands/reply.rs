//! Outbound reply seam used by the command handler.

use async_trait::async_trait;

use crate::telegram::TelegramError;

/// Sends plain-text replies to the chat a command came from.
#[async_trait]
pub trait Replier: Send + Sync {
    /// Sends one message.
    async fn reply(&self, text: &str) -> Result<(), TelegramError>;
}
