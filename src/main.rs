//! Site-Indexer main entry point
//!
//! This is the command-line interface for the Site-Indexer crawler.

use anyhow::Context;
use clap::Parser;
use site_indexer::config::{read_config, validate, Config};
use site_indexer::crawler::run_crawl;
use site_indexer::output::{CrawlReport, TermMatrix};
use site_indexer::storage::{open_storage, Storage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Site-Indexer: a single-site crawler that builds a deduplicated term index
///
/// Site-Indexer crawls one website from a seed URL, stays within the seed's
/// path, respects robots.txt, and stores one term-frequency record per
/// distinct page body.
#[derive(Parser, Debug)]
#[command(name = "site-indexer")]
#[command(version)]
#[command(about = "A single-site crawler and term indexer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Seed URL (overrides crawler.seed-url)
    #[arg(short = 'u', long = "url")]
    url: Option<String>,

    /// Maximum number of URLs to index (overrides crawler.max-to-index)
    #[arg(short = 'n', long = "number")]
    number: Option<u64>,

    /// Database path (overrides output.database-path)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Stop-word file (overrides crawler.stopwords-path)
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Maximum concurrent fetches (overrides crawler.max-concurrent-fetches)
    #[arg(short = 'c', long = "concurrency")]
    concurrency: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Delete the previous database and start over
    #[arg(long, conflicts_with = "report")]
    fresh: bool,

    /// Print a report from the database and write the term matrix, without crawling
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    tracing::info!(
        "Configuration loaded (fingerprint: {})",
        config.fingerprint()?
    );

    if cli.report {
        handle_report(&config)
    } else {
        handle_crawl(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_indexer=info,warn"),
            1 => EnvFilter::new("site_indexer=debug,info"),
            2 => EnvFilter::new("site_indexer=trace,debug"),
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

/// Reads the config file (if any), applies command-line overrides and validates the result
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            read_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(url) = &cli.url {
        config.crawler.seed_url = url.clone();
    }
    if let Some(number) = cli.number {
        config.crawler.max_to_index = Some(number);
    }
    if let Some(output) = &cli.output {
        config.output.database_path = output.clone();
    }
    if let Some(input) = &cli.input {
        config.crawler.stopwords_path = Some(input.clone());
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.max_concurrent_fetches = concurrency;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Removes the database and its SQLite side files
fn remove_database(path: &Path) -> anyhow::Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let file = PathBuf::from(file);
        if file.exists() {
            std::fs::remove_file(&file)
                .with_context(|| format!("Failed to remove {}", file.display()))?;
        }
    }
    Ok(())
}

/// Handles the --report mode: prints summary counts and writes the term matrix
fn handle_report(config: &Config) -> anyhow::Result<()> {
    let database = Path::new(&config.output.database_path);
    if !database.exists() {
        anyhow::bail!("Database not found: {}", database.display());
    }

    let storage = open_storage(database)
        .with_context(|| format!("Failed to open database {}", database.display()))?;

    CrawlReport::from_storage(&storage)?.print_summary();
    write_term_matrix(config, &storage)
}

/// Writes the document-term matrix of everything stored so far
fn write_term_matrix(config: &Config, storage: &dyn Storage) -> anyhow::Result<()> {
    let path = Path::new(&config.output.term_matrix_path);
    TermMatrix::from_storage(storage)?
        .save(path)
        .with_context(|| format!("Failed to write term matrix to {}", path.display()))
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    let database = PathBuf::from(&config.output.database_path);

    if fresh {
        tracing::info!("Starting fresh crawl (removing {})", database.display());
        remove_database(&database)?;
    } else {
        tracing::info!("Starting crawl (will resume from {} if present)", database.display());
    }

    let matrix_config = config.clone();
    let outcome = match run_crawl(config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!(
        "Crawl completed: {} pages and {} documents indexed this run",
        outcome.pages_indexed,
        outcome.documents_indexed
    );

    let storage = open_storage(&database)
        .with_context(|| format!("Failed to open database {}", database.display()))?;
    write_term_matrix(&matrix_config, &storage)
}
