//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use addrsync_core::pipeline::{
    FilterReport, PersistReport, ProgressReporter, Sources, filter_unassigned,
    persist_unassigned,
};
use addrsync_shared::{
    ASSIGNED_SNAPSHOT, AppConfig, GENERATED_SNAPSHOT, UNASSIGNED_SNAPSHOT, init_config,
    load_config, load_config_from,
};
use addrsync_snapshot::{AlwaysStale, MaxAge, SnapshotCache};

use crate::stores::EnvStores;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// addrsync — find generated addresses that were never assigned.
#[derive(Parser)]
#[command(
    name = "addrsync",
    version,
    about = "Reconcile generated addresses against assigned ones and store the unassigned set.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.addrsync/addrsync.toml).
    #[arg(long = "config", env = "ADDRSYNC_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,

    /// Snapshot directory (overrides `cache.dir`).
    #[arg(long, env = "ADDRSYNC_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Ignore existing input snapshots and refetch from the stores.
    #[arg(long, global = true)]
    pub refresh: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Filter unassigned addresses, then persist them.
    Run,

    /// Fetch (or load) both inventories and write the unassigned snapshot.
    Filter,

    /// Insert the unassigned snapshot into the destination collection.
    Persist,

    /// Inspect or clear local snapshots.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show which snapshots exist and whether they are fresh.
    Status,
    /// Delete the input snapshots.
    Clear {
        /// Also delete the unassigned snapshot.
        #[arg(long)]
        all: bool,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing & environment setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "addrsync=info",
        1 => "addrsync=debug",
        _ => "addrsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

/// Load `.env` from the working directory into the process environment, if present.
pub(crate) fn load_dotenv() -> Result<()> {
    match dotenv::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "loaded .env");
            Ok(())
        }
        Err(e) if e.not_found() => {
            debug!("no .env file found");
            Ok(())
        }
        Err(e) => Err(eyre!("failed to load .env: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config_file {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Run => cmd_run(&cli, &config).await,
        Command::Filter => cmd_filter(&cli, &config).await,
        Command::Persist => cmd_persist(&cli, &config).await,
        Command::Cache { ref action } => match action {
            CacheAction::Status => cmd_cache_status(&cli, &config),
            CacheAction::Clear { all } => cmd_cache_clear(&cli, &config, *all),
        },
        Command::Config { ref action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Build the snapshot cache from config and CLI overrides.
fn build_cache(cli: &Cli, config: &AppConfig) -> SnapshotCache {
    let dir = cli
        .cache_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.cache.dir));

    if cli.refresh {
        SnapshotCache::with_policy(dir, AlwaysStale)
    } else if let Some(secs) = config.cache.max_age_secs {
        SnapshotCache::with_policy(dir, MaxAge(Duration::from_secs(secs)))
    } else {
        SnapshotCache::new(dir)
    }
}

async fn cmd_run(cli: &Cli, config: &AppConfig) -> Result<()> {
    let cache = build_cache(cli, config);
    let stores = EnvStores::new(config);

    info!("running filter and persist");
    let sources = Sources {
        generated: &stores,
        assigned: &stores,
    };

    let filtered = filter_unassigned(sources, &cache, &CliProgress::new()).await?;
    print_filter_summary(&filtered);

    let persisted = persist_unassigned(&cache, &stores, &CliProgress::new()).await?;
    print_persist_summary(&persisted, &config.mongo.destination_collection);

    Ok(())
}

async fn cmd_filter(cli: &Cli, config: &AppConfig) -> Result<()> {
    let cache = build_cache(cli, config);
    let stores = EnvStores::new(config);

    let reporter = CliProgress::new();
    let sources = Sources {
        generated: &stores,
        assigned: &stores,
    };
    let report = filter_unassigned(sources, &cache, &reporter).await?;
    print_filter_summary(&report);

    Ok(())
}

async fn cmd_persist(cli: &Cli, config: &AppConfig) -> Result<()> {
    let cache = build_cache(cli, config);
    let stores = EnvStores::new(config);

    let reporter = CliProgress::new();
    let report = persist_unassigned(&cache, &stores, &reporter).await?;
    print_persist_summary(&report, &config.mongo.destination_collection);

    Ok(())
}

fn cmd_cache_status(cli: &Cli, config: &AppConfig) -> Result<()> {
    let cache = build_cache(cli, config);
    let now = chrono::Utc::now();

    println!();
    println!("  Cache:  {}", cache.dir().display());
    println!("  Policy: {}", cache.policy());
    println!();

    for name in [GENERATED_SNAPSHOT, ASSIGNED_SNAPSHOT, UNASSIGNED_SNAPSHOT] {
        match cache.status(name)? {
            Some(meta) => {
                let fresh = if cache.is_fresh(name)? { "fresh" } else { "stale" };
                println!(
                    "  {name:<28} {:>10} bytes  {}  age {}s  {fresh}",
                    meta.size_bytes,
                    meta.modified.to_rfc3339(),
                    meta.age(now).as_secs(),
                );
            }
            None => println!("  {name:<28} missing"),
        }
    }
    println!();

    Ok(())
}

fn cmd_cache_clear(cli: &Cli, config: &AppConfig, all: bool) -> Result<()> {
    let cache = build_cache(cli, config);

    let mut names = vec![GENERATED_SNAPSHOT, ASSIGNED_SNAPSHOT];
    if all {
        names.push(UNASSIGNED_SNAPSHOT);
    }

    for name in names {
        if cache.remove(name)? {
            println!("removed {}", cache.path_for(name).display());
        } else {
            debug!(snapshot = name, "nothing to remove");
        }
    }

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

fn print_filter_summary(report: &FilterReport) {
    println!();
    println!("  Filtered unassigned addresses.");
    println!("  Generated:  {}", report.generated);
    println!("  Assigned:   {}", report.assigned);
    println!("  Unassigned: {}", report.unassigned);
    println!("  Snapshot:   {}", report.snapshot.path.display());
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn print_persist_summary(report: &PersistReport, collection: &str) {
    if report.loaded == 0 {
        warn!("unassigned snapshot is empty, nothing was inserted");
    }

    println!();
    println!("  Persisted unassigned addresses.");
    println!("  Loaded:     {}", report.loaded);
    println!("  Inserted:   {}", report.inserted);
    println!("  Collection: {collection}");
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

// A stage that fails with `?` never calls `finish`; clear the line anyway.
impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
