//! Listing Harvester main entry point
//!
//! This is the command-line interface for running one harvest.

use anyhow::Context;
use clap::Parser;
use listing_harvester::config::{load_config_with_hash, Config};
use listing_harvester::harvest;
use listing_harvester::output::print_report;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Listing Harvester: walk a listing, fetch every item, normalize the results
///
/// The harvester resolves listing pages for a search key one by one, fetches
/// each listed item's detail content under a concurrency cap, and turns every
/// fetched record into a canonical record through a chat-completion API.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version)]
#[command(about = "Paginated listing harvester with normalized output", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Search key to harvest
    #[arg(short, long)]
    key: String,

    /// Maximum listing pages to walk (defaults to the configured value)
    #[arg(short, long)]
    max_pages: Option<u32>,

    /// Override the result artifact path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(output) = &cli.output {
        config.output.results_path = output.display().to_string();
    }

    let max_pages = cli.max_pages.unwrap_or(config.harvest.default_max_pages);

    if cli.dry_run {
        handle_dry_run(&config, &cli.key, max_pages);
        return Ok(());
    }

    let outcome = harvest(&config, &cli.key, max_pages)
        .await
        .context("harvest failed")?;

    if !cli.quiet {
        print_report(&outcome.report);
        println!("Results: {}", config.output.results_path);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration and request
fn handle_dry_run(config: &Config, key: &str, max_pages: u32) {
    println!("=== Listing Harvester Dry Run ===\n");

    println!("Request:");
    println!("  Key: {}", key);
    println!("  Max pages: {}", max_pages);

    println!("\nHarvest:");
    println!(
        "  Max concurrent fetches: {}",
        config.harvest.max_concurrent_fetches
    );
    match config.harvest.items_per_page {
        Some(cap) => println!("  Items per page: {}", cap),
        None => println!("  Items per page: all"),
    }
    println!("  Listing timeout: {}ms", config.harvest.listing_timeout_ms);
    println!("  Fetch timeout: {}ms", config.harvest.fetch_timeout_ms);
    println!("  Normalize timeout: {}ms", config.harvest.normalize_timeout_ms);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nSource:");
    println!("  Listing: {}", config.source.listing_url);
    println!("  Item selector: {}", config.source.listing_item_selector);
    println!("  Detail: {}", config.source.detail_url);
    println!("  Fields ({}):", config.source.fields.len());
    for (name, selector) in &config.source.fields {
        println!("    - {} <- {}", name, selector);
    }
    if let Some(selector) = &config.source.auxiliary_selector {
        println!(
            "  Embedded document: {} [{}] -> {}",
            selector, config.source.auxiliary_attribute, config.source.auxiliary_field
        );
    }

    println!("\nNormalizer:");
    println!("  Endpoint: {}", config.normalizer.base_url);
    println!("  Model: {}", config.normalizer.model);
    let key_state = if std::env::var(&config.normalizer.api_key_env).is_ok() {
        "set"
    } else {
        "missing"
    };
    println!("  API key ({}): {}", config.normalizer.api_key_env, key_state);

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_path);
    if let Some(raw) = &config.output.raw_path {
        println!("  Raw records: {}", raw);
    }

    println!("\n✓ Configuration is valid");
}
