//! Command-line interface definitions for the category scraper.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Storage paths can also be provided via environment variables.

use clap::Parser;

/// Command-line arguments for the scraper.
///
/// # Examples
///
/// ```sh
/// # Discover every category and sync them all
/// fakulteti_news --headless
///
/// # Sync a single known category into custom files
/// fakulteti_news -d ./data/posts.jsonl -s ./data/state.json \
///     --category "Наша тема=https://www.fakulteti.mk/category/nasha-tema"
///
/// # Only print what discovery finds
/// fakulteti_news --list-categories
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Root URL of the news site
    #[arg(long, default_value = "https://www.fakulteti.mk")]
    pub site_root: String,

    /// JSON-lines file that scraped posts are appended to
    #[arg(short, long, env = "FAKULTETI_DATASET", default_value = "posts.jsonl")]
    pub dataset: String,

    /// JSON file holding the per-category resume markers
    #[arg(short, long, env = "FAKULTETI_STATE", default_value = "sync_state.json")]
    pub state: String,

    /// Optional path to a YAML file overriding selectors and timings
    #[arg(short, long)]
    pub config: Option<String>,

    /// Category to sync as NAME=URL; repeat for several. Skips discovery.
    #[arg(long = "category", value_name = "NAME=URL", value_parser = parse_category)]
    pub categories: Vec<(String, String)>,

    /// Restrict the run to these category names; repeat for several
    #[arg(long)]
    pub only: Vec<String>,

    /// Upper bound on "load more" clicks per category
    #[arg(long)]
    pub max_expansions: Option<usize>,

    /// Run the browser without a visible window
    #[arg(long)]
    pub headless: bool,

    /// Print the discovered categories and exit
    #[arg(long)]
    pub list_categories: bool,

    /// After the run, write the whole dataset as one JSON array to this path
    #[arg(long)]
    pub export_json: Option<String>,
}

fn parse_category(raw: &str) -> Result<(String, String), String> {
    let (name, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=URL, got `{raw}`"))?;
    let name = name.trim();
    let url = url.trim();
    if name.is_empty() || url.is_empty() {
        return Err(format!("expected NAME=URL, got `{raw}`"));
    }
    Ok((name.to_string(), url.to_string()))
}
