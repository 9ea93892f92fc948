//! orgwatch CLI
//!
//! Meant to be run periodically (cron, systemd timer). Exits non-zero only
//! when the run cannot start.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use orgwatch::{
    error::{AppError, Result},
    models::{Config, LoggingConfig},
    pipeline,
    services::RsiClient,
    storage::OrgStore,
};

/// orgwatch - Star Citizen organization tracker
#[derive(Parser, Debug)]
#[command(
    name = "orgwatch",
    version,
    about = "Imports organization snapshots and records their change history"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh tracked organizations (default). Sweeps the listing first
    /// when the store is empty.
    Run {
        /// Sweep the public listing before refreshing
        #[arg(long)]
        discover: bool,
    },

    /// Sweep the public listing for new organizations
    Discover,

    /// Show the stored snapshot and recent changes of one organization
    History {
        symbol: String,

        /// Number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Validate the configuration file
    Validate,

    /// Show store statistics
    Info,
}

/// Initialize logging from config, appending to the log file when one is set.
fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    if let Some(path) = logging.file.as_deref().filter(|p| !p.trim().is_empty()) {
        let path = Path::new(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::setup(format!("cannot create {}: {e}", parent.display())))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AppError::setup(format!("cannot open log {}: {e}", path.display())))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, load_error) = match Config::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(&config.logging, cli.verbose)?;

    if let Some(e) = load_error {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
    }

    match cli.command.unwrap_or(Command::Run { discover: false }) {
        Command::Run { discover } => {
            config.validate()?;
            let client = RsiClient::new(&config)?;
            let mut store = OrgStore::open(&config.storage)?;

            let first_run = !discover && store.is_empty()?;
            if first_run {
                log::info!("Store is empty, sweeping the listing first");
            }
            if discover || first_run {
                pipeline::run_discovery(&config, &client, &mut store).await?;
            }
            pipeline::run_import(&config, &client, &mut store).await?;
        }

        Command::Discover => {
            config.validate()?;
            let client = RsiClient::new(&config)?;
            let mut store = OrgStore::open(&config.storage)?;

            pipeline::run_discovery(&config, &client, &mut store).await?;
        }

        Command::History { symbol, limit } => {
            let store = OrgStore::open(&config.storage)?;

            let Some(snapshot) = store.snapshot(&symbol)? else {
                println!("{symbol}: not in store");
                return Ok(());
            };

            let org = &snapshot.org;
            println!("{} ({}) [{}]", org.name, snapshot.symbol(), snapshot.status);
            println!("  members:     {}", display_opt(org.member_count));
            println!("  archetype:   {}", display_opt(org.archetype.as_deref()));
            println!("  language:    {}", display_opt(org.language.as_deref()));
            println!("  recruiting:  {}", display_opt(org.recruitment.as_deref()));
            println!("  first seen:  {}", snapshot.first_seen.format("%Y-%m-%d %H:%M:%S"));
            println!("  last seen:   {}", snapshot.last_seen.format("%Y-%m-%d %H:%M:%S"));

            let entries = store.history(&symbol, Some(limit))?;
            if entries.is_empty() {
                println!("No recorded changes.");
            }
            for entry in entries {
                println!("  {}", entry.describe());
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            RsiClient::new(&config)?;

            println!("Config OK ({})", cli.config.display());
        }

        Command::Info => {
            let store = OrgStore::open(&config.storage)?;
            let stats = store.stats()?;

            println!("Database: {}", config.storage.database);
            if let Some(history) = &config.storage.history_database {
                println!("History database: {history}");
            }
            println!("Active organizations: {}", stats.active);
            println!("Inactive organizations: {}", stats.inactive);
            println!("History entries: {}", stats.history_entries);
        }
    }

    Ok(())
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
