//! Listing Harvester main entry point
//!
//! This is the command-line interface for the job-listing harvester.

use anyhow::{bail, Context};
use clap::Parser;
use listing_harvester::config::{load_config_with_hash, Config, DetailSource};
use listing_harvester::harvest::run_harvest;
use listing_harvester::output::{load_statistics, print_statistics, print_summary};
use listing_harvester::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing Harvester: a resilient job-listing harvester
///
/// Reveals every item of a job portal's catalog, fetches and parses each
/// listing page, and writes a deduplicated, timestamped spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A resilient job-listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a new journal run even if the previous one is unfinished
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the run journal and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(&config, &config_hash, cli.fresh).await?;
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Listing Harvester Dry Run ===\n");

    println!("Catalog:");
    println!("  URL: {}", config.catalog.url);
    println!("  Max reveal clicks: {}", config.catalog.max_reveal_clicks);
    println!(
        "  Max enumeration attempts: {}",
        config.catalog.max_enumeration_attempts
    );

    println!("\nFetching:");
    println!(
        "  Mode: {}",
        if config.fetch.robust { "robust" } else { "fast" }
    );
    println!(
        "  Detail source: {}",
        match config.fetch.detail_source {
            DetailSource::Network => "network",
            DetailSource::Browser => "browser",
        }
    );
    println!("  Verify certificates: {}", config.fetch.verify_certificates);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!("  User agent: {}", config.fetch.user_agent);

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Executable: {}",
        config.browser.executable.as_deref().unwrap_or("auto-detected")
    );
    println!(
        "  Page load timeout: {}s",
        config.browser.page_load_timeout_secs
    );
    println!("  Settle time: {}ms", config.browser.settle_ms);

    let pacing = &config.pacing;
    println!("\nPacing:");
    println!(
        "  Reveal delay: {}-{}s",
        pacing.reveal_delay_secs.0, pacing.reveal_delay_secs.1
    );
    println!(
        "  Request delay: {}-{}s (+{}ms after each record)",
        pacing.request_delay_secs.0, pacing.request_delay_secs.1, pacing.post_request_delay_ms
    );
    println!(
        "  Skip delay: {}-{}s (+{}s per skipped link)",
        pacing.skip_delay_secs.0, pacing.skip_delay_secs.1, pacing.skip_penalty_secs
    );
    println!(
        "  Connection backoff: {}-{}s (+{}s per consecutive failure)",
        pacing.connection_backoff_secs.0,
        pacing.connection_backoff_secs.1,
        pacing.backoff_penalty_secs
    );
    println!("  Timeout backoff: {}s", pacing.timeout_backoff_secs);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Portal suffix: {}", config.output.portal_suffix);
    println!(
        "  Journal: {}",
        config.output.database_path.as_deref().unwrap_or("disabled")
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the run journal
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(database_path) = &config.output.database_path else {
        bail!("no database-path configured, the run journal is disabled");
    };

    println!("Database: {}\n", database_path);

    let storage = SqliteStorage::new(Path::new(database_path))
        .with_context(|| format!("failed to open {}", database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    if config.output.database_path.is_some() {
        if fresh {
            tracing::info!("Starting fresh harvest (ignoring previous runs)");
        } else {
            tracing::info!("Starting harvest (will resume an unfinished run)");
        }
    }

    let summary = run_harvest(config, config_hash, fresh)
        .await
        .context("harvest failed")?;

    if let Some(reason) = &summary.abort_reason {
        tracing::warn!("Harvest stopped early, partial results were written: {}", reason);
    } else {
        tracing::info!("Harvest completed successfully");
    }
    print_summary(&summary);

    Ok(())
}
