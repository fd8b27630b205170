//! Flat Filter Bot Library
//!
//! A Telegram bot that relays immowelt rental listings matching a
//! price range.
//!
//! This crate provides the core functionality for:
//! - Loading the bot and search configuration from the environment
//! - Fetching search result pages and extracting listings
//! - Parsing and answering `/filter` commands
//! - Receiving updates via webhook or long polling

pub mod commands;
pub mod config;
pub mod listings;
pub mod telegram;
