//! Standalone checker for listing extraction.
//!
//! Runs the search pipeline without Telegram, either against the live site
//! or against a saved results page, and reports every listing block.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use flat_filter_bot::config::SearchSettings;
use flat_filter_bot::listings::{ExtractError, ImmoweltSource, Listing, ListingExtractor, SearchFilter};

/// Listing extraction checker.
#[derive(Parser, Debug)]
#[command(name = "check_listings")]
#[command(about = "Fetches a results page and reports which listing blocks can be extracted")]
#[command(version)]
#[command(group(clap::ArgGroup::new("input").required(true).args(["city", "file"])))]
struct Args {
    /// City to search (live fetch).
    #[arg(long, requires_all = ["min", "max"])]
    city: Option<String>,

    /// Minimum price for a live fetch.
    #[arg(long)]
    min: Option<i64>,

    /// Maximum price for a live fetch.
    #[arg(long)]
    max: Option<i64>,

    /// Saved results page to parse instead of fetching.
    #[arg(short, long)]
    file: Option<String>,

    /// Path to the .env file for search settings.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Show every listing, not just the summary.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let _ = dotenvy::from_filename(&args.env_file);
    let settings = SearchSettings::from_env_with_defaults();

    let html = match load_page(&args, &settings).await {
        Ok(html) => html,
        Err(message) => {
            eprintln!("✗ {message}");
            return ExitCode::FAILURE;
        }
    };

    let candidates = ListingExtractor::new(settings.base_url.as_str()).extract_candidates(&html);
    report(&candidates, settings.max_results, args.verbose)
}

async fn load_page(args: &Args, settings: &SearchSettings) -> Result<String, String> {
    if let Some(path) = &args.file {
        println!("Parsing: {path}");
        return std::fs::read_to_string(path).map_err(|e| format!("Failed to read {path}: {e}"));
    }

    let (Some(city), Some(min_price), Some(max_price)) = (&args.city, args.min, args.max) else {
        return Err("--city, --min and --max are required for a live fetch".to_owned());
    };

    let filter = SearchFilter {
        city: city.clone(),
        min_price,
        max_price,
    };

    let source = ImmoweltSource::new(settings).map_err(|e| e.to_string())?;
    if let Ok(url) = source.search_url(&filter) {
        println!("Fetching: {url}");
    }

    source
        .fetch_html(&filter)
        .await
        .map_err(|e| format!("Fetch failed: {e}"))
}

fn report(candidates: &[Result<Listing, ExtractError>], max_results: usize, verbose: bool) -> ExitCode {
    let total = candidates.len();
    let mut errors = 0;

    println!();
    for (i, candidate) in candidates.iter().enumerate() {
        match candidate {
            Ok(listing) => {
                if verbose {
                    let marker = if i < max_results { "→" } else { " " };
                    println!("{marker} [{i}] {} | {} | {}", listing.title, listing.price, listing.url);
                }
            }
            Err(e) => {
                errors += 1;
                println!("  ✗ {e}");
            }
        }
    }

    println!();
    let valid = total - errors;

    if total == 0 {
        println!("⚠ No listing blocks found on the page.");
        println!("  The page may be empty for this filter, or the site layout changed.");
        return ExitCode::SUCCESS;
    }

    if errors == 0 {
        println!("✓ All {total} listing blocks extracted.");
        println!("  The bot would reply with {} of them.", valid.min(max_results));
        ExitCode::SUCCESS
    } else {
        println!("✗ {errors} malformed listing block(s) out of {total}");
        println!("  Extracted: {valid}/{total}");
        ExitCode::FAILURE
    }
}
