//! Site-Corpus main entry point
//!
//! This is the command-line interface for the Site-Corpus crawler.

use anyhow::Context;
use clap::Parser;
use site_corpus::config::{config_fingerprint, load_config, Config};
use site_corpus::crawler::{CrawlOutcome, CrawlSession};
use site_corpus::output::{load_statistics, print_statistics, OutputLayout};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Site-Corpus: a polite single-domain corpus crawler
///
/// Site-Corpus crawls one domain breadth-first while respecting robots.txt
/// and rate limits, and writes raw HTML, per-page JSON records and JSONL
/// logs under BASE_DIR. Interrupted crawls resume from the checkpoint.
///
/// Settings come from the optional TOML file, overridden by environment
/// variables (SEED_URL, DOMAIN, MAX_PAGES, RATE_LIMIT_SECONDS, ...).
#[derive(Parser, Debug)]
#[command(name = "site-corpus")]
#[command(version)]
#[command(about = "A polite single-domain corpus crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from the seed URL, ignoring any checkpoint
    #[arg(long)]
    fresh: bool,

    /// Validate the configuration, print it and exit
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    dry_run: bool,

    /// Show crawl statistics from the output directory and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = load_config(cli.config.as_deref()).context("Invalid configuration")?;
    tracing::info!(
        "Configuration loaded (fingerprint: {})",
        config_fingerprint(&config)
    );

    if cli.dry_run {
        handle_dry_run(&config)?;
        return Ok(0);
    }

    if cli.stats {
        handle_stats(&config)?;
        return Ok(0);
    }

    let outcome = handle_crawl(config, cli.fresh).await?;
    Ok(outcome.exit_code())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "site_corpus=info,warn",
            1 => "site_corpus=debug,info",
            2 => "site_corpus=trace,debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Site-Corpus Dry Run ===\n");

    println!("Crawl:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    println!("  Domain: {}", config.crawler.domain);
    match config.crawler.page_cap() {
        Some(cap) => println!("  Max pages: {}", cap),
        None => println!("  Max pages: unlimited"),
    }
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!(
        "  Checkpoint every: {} pages",
        config.crawler.checkpoint_interval
    );

    println!("\nPoliteness:");
    println!("  User agent: {}", config.politeness.user_agent);
    println!("  Rate limit: {}s", config.politeness.rate_limit_seconds);
    println!("  Timeout: {}s", config.politeness.timeout);
    println!(
        "  Retries: {} (backoff {}s, capped at {}s)",
        config.politeness.max_retries,
        config.politeness.backoff_base_seconds,
        config.politeness.backoff_max_seconds
    );
    println!("  Max redirects: {}", config.politeness.max_redirects);

    println!("\nOutput:");
    println!("  Base directory: {}", config.output.base_dir.display());

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: reads the output directory and prints a summary
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let layout = OutputLayout::new(&config.output.base_dir);
    println!("Output: {}\n", layout.base_dir().display());

    let stats = load_statistics(&layout)
        .with_context(|| format!("Failed to read {}", layout.base_dir().display()))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<CrawlOutcome> {
    let mut session = CrawlSession::new(config, fresh).context("Failed to start crawl session")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::warn!("Termination signal received, finishing current page");
        let _ = shutdown_tx.send(true);
    });

    let outcome = session.run(shutdown_rx).await;
    match &outcome {
        CrawlOutcome::Complete | CrawlOutcome::LimitReached => {
            tracing::info!("Crawl finished: {}", outcome)
        }
        CrawlOutcome::Interrupted(_) => tracing::warn!("Crawl stopped: {}", outcome),
    }

    Ok(outcome)
}

/// Resolves on Ctrl-C or, on unix, SIGTERM
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
