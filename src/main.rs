//! Travel Health Scraper main entry point
//!
//! This is the command-line interface for the travel health data pipeline.

use clap::Parser;
use std::path::PathBuf;
use travel_health_scraper::config::{load_config_with_hash, Config};
use travel_health_scraper::crawler::{run_scrape, user_agent_string, ScrapeOptions};
use travel_health_scraper::output::{print_summary, RunSummary};
use travel_health_scraper::storage::{JsonProgressStore, ProgressStore};
use tracing_subscriber::EnvFilter;

/// Travel Health Scraper: per-country health advice as compact JSON
///
/// Fetches every country page listed in the directory, extracts vaccine
/// recommendations, other health risks and malaria guidance, and writes them
/// as region-partitioned files sized for client-side storage. Interrupted runs
/// resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "travel-health-scraper")]
#[command(version = "1.0.0")]
#[command(about = "Travel health advisory scraper", long_about = None)]
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

    /// Start a fresh run, ignoring saved progress
    #[arg(long)]
    fresh: bool,

    /// Only process the first N countries of the directory (smoke test)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Validate config and show what would run without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show the summary of saved progress and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, cli.fresh, cli.limit);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        let options = ScrapeOptions {
            fresh: cli.fresh,
            limit: cli.limit,
            config_hash: Some(config_hash),
        };
        handle_scrape(config, options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("travel_health_scraper=info,warn"),
            1 => EnvFilter::new("travel_health_scraper=debug,info"),
            2 => EnvFilter::new("travel_health_scraper=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &Config, fresh: bool, limit: Option<usize>) {
    println!("=== Travel Health Scraper Dry Run ===\n");

    println!("Source:");
    println!("  Base URL: {}", config.scraper.base_url);
    println!("  Directory: {}", config.scraper.countries_url);

    println!("\nPacing:");
    println!(
        "  Delay: {}ms + up to {}ms jitter",
        config.scraper.delay_ms, config.scraper.random_delay_max_ms
    );
    println!(
        "  After an error: {}ms",
        config.scraper.delay_ms * u64::from(config.scraper.error_delay_multiplier)
    );
    println!(
        "  Retries: {} (backoff from {}ms)",
        config.scraper.max_retries, config.scraper.retry_backoff_ms
    );
    println!("  Timeout: {}ms", config.scraper.timeout_ms);
    println!("  Request ceiling: {}", config.scraper.max_requests);

    println!("\nUser Agent:");
    println!("  {}", user_agent_string(&config.user_agent));

    println!("\nOutput:");
    println!("  Directory: {}", config.output.output_dir);
    println!(
        "  Partition warning: {} bytes",
        config.output.partition_warning_bytes
    );
    println!(
        "  Checkpoint every {} countries",
        config.scraper.progress_save_interval
    );

    println!("\n✓ Configuration is valid");
    match limit {
        Some(n) => println!("✓ Would process the first {} countries", n),
        None => println!("✓ Would process every country in the directory"),
    }
    if fresh {
        println!("✓ Saved progress would be ignored");
    }
}

/// Handles the --stats mode: summarizes saved progress
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonProgressStore::in_dir(&config.output.dir());
    println!("Progress file: {}\n", store.path().display());

    match store.load()? {
        Some(progress) => {
            let summary = RunSummary::from_progress(&progress, 0, 0);
            print_summary(&summary);
        }
        None => println!("No saved progress found"),
    }

    Ok(())
}

/// Handles the main scrape operation
async fn handle_scrape(config: Config, options: ScrapeOptions) -> Result<(), Box<dyn std::error::Error>> {
    if options.fresh {
        tracing::info!("Starting fresh run (ignoring saved progress)");
    } else {
        tracing::info!("Starting run (will resume from saved progress)");
    }

    match run_scrape(config, options).await {
        Ok(outcome) => {
            print_summary(&outcome.summary);
            match &outcome.published {
                Some(published) => {
                    for partition in published.oversized() {
                        println!(
                            "⚠ {} is over the size warning threshold ({} bytes)",
                            partition.file_name, partition.bytes
                        );
                    }
                }
                None => println!("\n⚠ Output files could not be written, see the log"),
            }
            if outcome.batch.ceiling_reached {
                println!(
                    "\nRequest ceiling reached; {} countries left for the next run",
                    outcome.batch.pending
                );
            }
            tracing::info!("Scrape completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e.into())
        }
    }
}
