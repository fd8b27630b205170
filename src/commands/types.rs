//! Command types and definitions.

use std::fmt;
use std::num::IntErrorKind;

use thiserror::Error;

use crate::listings::SearchFilter;

/// Reply sent when a search produced no listings.
pub const NOTHING_FOUND: &str = "Nothing found 😕";

/// Greeting sent for `/start`.
pub const GREETING: &str = "Hi! Send /filter City MinPrice MaxPrice \
                            (for example: /filter berlin 400 800) to search for flats.";

/// Why `/filter` arguments were rejected.
///
/// The `Display` text is the reply shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FilterArgsError {
    #[error("Error. Use the format: /filter City MinPrice MaxPrice\nExample: /filter berlin 400 800")]
    Usage,

    #[error("Price must be a number!")]
    NonNumericPrice,

    #[error("Price is too large!")]
    PriceOutOfRange,
}

/// Available bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Greet the user and explain the filter syntax.
    Start,

    /// Show help information.
    Help,

    /// Search listings; carries the raw positional arguments.
    Filter(Vec<String>),
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// `bot_username` is the bot's own username (without `@`); commands
    /// addressed to a different bot via `/cmd@other_bot` are ignored.
    ///
    /// Returns `None` if the message is not a known command.
    #[must_use]
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let head = tokens.next()?.strip_prefix('/')?;

        let name = match head.split_once('@') {
            Some((name, mention)) => {
                let addressed_to_us =
                    bot_username.is_none_or(|own| own.eq_ignore_ascii_case(mention));
                if !addressed_to_us {
                    return None;
                }
                name
            }
            None => head,
        };

        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" | "h" => Some(Self::Help),
            "filter" => Some(Self::Filter(tokens.map(str::to_owned).collect())),
            _ => None,
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Filter(_) => "filter",
        }
    }

    /// Returns all available commands with their descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str)> {
        vec![
            ("/filter <city> <min> <max>", "Search rental flats in a price range"),
            ("/start", "Show the greeting"),
            ("/help", "Show this help message"),
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(args) if !args.is_empty() => write!(f, "filter {}", args.join(" ")),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Validates `/filter` arguments: `<city> <min_price> <max_price>`.
///
/// # Errors
///
/// Returns [`FilterArgsError::Usage`] unless exactly three arguments are
/// given or the city is a bare `.`/`..` path token,
/// [`FilterArgsError::NonNumericPrice`] if either price is not an integer and
/// [`FilterArgsError::PriceOutOfRange`] if it does not fit in an `i64`.
pub fn parse_filter_args(args: &[String]) -> Result<SearchFilter, FilterArgsError> {
    let [city, min_price, max_price] = args else {
        return Err(FilterArgsError::Usage);
    };

    if matches!(city.as_str(), "." | "..") {
        return Err(FilterArgsError::Usage);
    }

    Ok(SearchFilter {
        city: city.clone(),
        min_price: parse_price(min_price)?,
        max_price: parse_price(max_price)?,
    })
}

fn parse_price(raw: &str) -> Result<i64, FilterArgsError> {
    raw.parse().map_err(|e: std::num::ParseIntError| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => FilterArgsError::PriceOutOfRange,
        _ => FilterArgsError::NonNumericPrice,
    })
}

/// Acknowledgement sent before a search starts.
#[must_use]
pub fn searching_message(filter: &SearchFilter) -> String {
    format!(
        "Searching for flats in {} from {}€ to {}€... please wait ⏳",
        filter.city, filter.min_price, filter.max_price
    )
}

/// Result of command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command was accepted and carried out.
    pub success: bool,

    /// Number of listings the search returned (before truncation).
    pub listings_found: usize,

    /// Number of messages sent back to the chat.
    pub replies_sent: usize,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub const fn success(replies_sent: usize) -> Self {
        Self {
            success: true,
            listings_found: 0,
            replies_sent,
        }
    }

    /// Creates a successful search result.
    #[must_use]
    pub const fn search(listings_found: usize, replies_sent: usize) -> Self {
        Self {
            success: true,
            listings_found,
            replies_sent,
        }
    }

    /// Creates an error result.
    #[must_use]
    pub const fn error(replies_sent: usize) -> Self {
        Self {
            success: false,
            listings_found: 0,
            replies_sent,
        }
    }
}
