//! Long-polling update loop, used when no webhook URL is configured.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{TelegramBot, TelegramError, UpdateDispatcher};

/// Seconds Telegram holds a `getUpdates` call open when there is nothing to deliver.
pub const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll before trying again.
const ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Pulls updates from the Bot API and hands them to the dispatcher.
#[derive(Debug)]
pub struct UpdatePoller {
    bot: Arc<TelegramBot>,
    dispatcher: UpdateDispatcher,
    offset: i64,
    timeout_secs: u64,
}

impl UpdatePoller {
    #[must_use]
    pub const fn new(bot: Arc<TelegramBot>, dispatcher: UpdateDispatcher) -> Self {
        Self {
            bot,
            dispatcher,
            offset: 0,
            timeout_secs: POLL_TIMEOUT_SECS,
        }
    }

    /// Sets the long-polling timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Offset of the next update to request.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.offset
    }

    /// Performs one `getUpdates` call and dispatches what it returns.
    ///
    /// Returns the number of updates received. Received updates are
    /// acknowledged by the next call through the advanced offset.
    pub async fn poll_once(&mut self) -> Result<usize, TelegramError> {
        let updates = self.bot.get_updates(self.offset, self.timeout_secs).await?;
        let count = updates.len();

        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            self.dispatcher.spawn(update);
        }

        if count > 0 {
            debug!("Dispatched {} updates, next offset {}", count, self.offset);
        }
        Ok(count)
    }

    /// Polls forever. Errors are logged and followed by a short pause.
    pub async fn run(mut self) {
        info!("Polling for updates (timeout {}s)", self.timeout_secs);

        loop {
            match self.poll_once().await {
                Ok(_) => {}
                Err(TelegramError::FloodWait(seconds)) => {
                    warn!("Flood wait while polling: {} seconds", seconds);
                    tokio::time::sleep(Duration::from_secs(u64::from(seconds))).await;
                }
                Err(e) => {
                    warn!("Polling failed: {}", e);
                    tokio::time::sleep(ERROR_PAUSE).await;
                }
            }
        }
    }
}
