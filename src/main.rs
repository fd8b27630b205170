//! Flat Filter Bot - Main Entry Point
//!
//! A Telegram bot that answers `/filter City MinPrice MaxPrice` with
//! matching rental listings from immowelt.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use flat_filter_bot::commands::CommandHandler;
use flat_filter_bot::config::{BotConfig, SearchSettings, mask_token};
use flat_filter_bot::listings::{ImmoweltSource, ListingSource};
use flat_filter_bot::telegram::{TelegramBot, UpdateDispatcher, UpdatePoller, WebhookState, webhook};

/// Telegram bot relaying apartment listings in a price range.
#[derive(Parser, Debug)]
#[command(name = "flat_filter_bot")]
#[command(about = "Relay immowelt rental listings to Telegram")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Use long polling even if WEBHOOK_URL is set.
    #[arg(long)]
    polling: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let bot_config =
        BotConfig::from_env().context("Failed to load bot configuration from environment")?;
    let search_settings = SearchSettings::from_env_with_defaults();

    info!(
        "Search settings: site={}, timeout={}s, max_results={}",
        search_settings.base_url, search_settings.timeout_secs, search_settings.max_results
    );

    let source: Arc<dyn ListingSource> = Arc::new(
        ImmoweltSource::new(&search_settings).context("Failed to create listing client")?,
    );

    let bot = Arc::new(TelegramBot::new(bot_config.token.as_str()).context("Failed to create Bot API client")?);

    let mut handler = CommandHandler::new(source, search_settings.max_results);
    match bot.get_me().await {
        Ok(me) => {
            info!(
                "Authorized as @{} ({})",
                me.username.as_deref().unwrap_or("?"),
                mask_token(&bot_config.token)
            );
            if let Some(username) = me.username {
                handler = handler.with_bot_username(username);
            }
        }
        Err(e) => warn!("Could not fetch bot account: {}. Accepting all /cmd@bot mentions.", e),
    }

    let dispatcher = UpdateDispatcher::new(Arc::clone(&bot), Arc::new(handler));

    match bot_config.callback_url() {
        Some(callback_url) if !args.polling => {
            run_webhook(&bot_config, &bot, dispatcher, &callback_url).await
        }
        _ => run_polling(&bot, dispatcher).await,
    }
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Registers the webhook and serves it until Ctrl+C.
async fn run_webhook(
    config: &BotConfig,
    bot: &TelegramBot,
    dispatcher: UpdateDispatcher,
    callback_url: &str,
) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind webhook listener to {addr}"))?;

    bot.set_webhook(callback_url, config.webhook_secret.as_deref())
        .await
        .context("Failed to register webhook")?;

    info!(
        "Webhook registered at {}/{}",
        config.webhook_url.as_deref().unwrap_or_default(),
        mask_token(&config.token)
    );

    let state = WebhookState::new(dispatcher, config.webhook_secret.as_deref());
    let router = webhook::router(&config.webhook_path(), state);

    info!("Bot is running. Use Ctrl+C to stop.");
    webhook::serve(listener, router, shutdown_signal())
        .await
        .context("Webhook server error")?;

    info!("Shutting down...");
    Ok(())
}

/// Drops any webhook and long-polls until Ctrl+C.
async fn run_polling(bot: &Arc<TelegramBot>, dispatcher: UpdateDispatcher) -> Result<()> {
    bot.delete_webhook()
        .await
        .context("Failed to remove webhook before polling")?;

    let poller = UpdatePoller::new(Arc::clone(bot), dispatcher);

    info!("Bot is running in polling mode. Use Ctrl+C to stop.");
    tokio::select! {
        () = poller.run() => {}
        () = shutdown_signal() => {}
    }

    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C");
}
