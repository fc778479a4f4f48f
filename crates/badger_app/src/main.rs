//! `badger` - command-line client for the subscriber dashboard.
//!
//! Settings come from `badger.ron` (or `--config`), overridden by flags and
//! `BADGER_*` environment variables.

mod commands;
mod platform;

use std::path::PathBuf;

use anyhow::{Context, Result};
use badger_engine::DashboardClient;
use badger_logging::badger_debug;
use clap::{Parser, Subcommand};

use commands::import::ImportArgs;
use commands::list::ListArgs;
use platform::config::{AppConfig, Overrides};
use platform::logging::{self, LogDestination};

#[derive(Debug, Parser)]
#[command(name = "badger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dashboard server URL.
    #[arg(long, env = "BADGER_BASE_URL")]
    base_url: Option<String>,

    /// Config file (defaults to ./badger.ron when present).
    #[arg(long, env = "BADGER_CONFIG")]
    config: Option<PathBuf>,

    /// Milliseconds between export status checks.
    #[arg(long, env = "BADGER_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Status checks allowed before an export gives up.
    #[arg(long, env = "BADGER_RETRY_BUDGET")]
    retry_budget: Option<u32>,

    /// Also write logs to this file.
    #[arg(long, env = "BADGER_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            poll_interval_ms: self.poll_interval_ms,
            retry_budget: self.retry_budget,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Export all subscribers and print the download URL.
    Export,
    /// Print a collection as JSON lines.
    List(ListArgs),
    /// Upload a CSV file and import its subscribers.
    Import(ImportArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(
        LogDestination::from_log_file(cli.log_file.as_deref()),
        badger_logging::level_for_verbosity(cli.verbose),
    );

    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(&cli.overrides());
    badger_debug!("Effective config: {:?}", config);
    let client = DashboardClient::connect(config.base_url()?, config.transport_settings())
        .context("failed to build HTTP client")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Export => commands::export::execute(&client, config.poller_settings()).await,
            Commands::List(args) => commands::list::execute(&client, args).await,
            Commands::Import(args) => commands::import::execute(&client, args).await,
        }
    })
}
