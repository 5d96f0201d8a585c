//! # Relocator CLI
//!
//! Thin driver around the migration orchestrator: parse the request list,
//! load configuration, run the scheduler against an inventory snapshot, and
//! emit the ordered final report.
//!
//! The shipped provider is the deterministic in-memory one, which makes this
//! binary a plan-rehearsal tool: it answers "which of these migrations would
//! validate, where would they land, and how does the run unfold" without
//! touching live infrastructure. A live vendor backend plugs in by
//! implementing `InfrastructureProvider` and swapping it here.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use relocator_core::config::{ConfigManager, ConfigurationError, RelocatorConfig};
use relocator_core::logging::init_structured_logging;
use relocator_core::models::{MigrationRequest, RunReport};
use relocator_core::orchestration::{
    probe_endpoints, LoggingNotificationSink, MigrationScheduler, NotificationSink,
    NullNotificationSink,
};
use relocator_core::provider::memory::{InMemoryProvider, InventorySnapshot};

#[derive(Parser)]
#[command(name = "relocator")]
#[command(about = "Bulk cross-vCenter VM relocation orchestrator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Migration requests file: a JSON array of request objects
    requests: PathBuf,

    /// Inventory snapshot file (JSON) the in-memory provider serves
    #[arg(short, long)]
    inventory: PathBuf,

    /// Configuration directory containing relocator-config.yaml
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment overriding RELOCATOR_ENV (development, test, production)
    #[arg(short, long)]
    environment: Option<String>,

    /// Override scheduler.max_concurrent
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Override scheduler.free_buffer_percent
    #[arg(long)]
    free_buffer_percent: Option<f64>,

    /// Override scheduler.poll_interval_seconds
    #[arg(long)]
    poll_interval_seconds: Option<u64>,

    /// Write the final report JSON here instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> anyhow::Result<RelocatorConfig> {
    let manager = match (&cli.config_dir, &cli.environment) {
        (Some(dir), Some(env)) => {
            ConfigManager::load_from_directory_with_env(Some(dir.clone()), env)?
        }
        (Some(dir), None) => ConfigManager::load_from_directory(Some(dir.clone()))?,
        (None, env) => match ConfigManager::load_from_directory(None) {
            Ok(manager) => manager,
            // No config file is fine for a CLI run; defaults apply
            Err(ConfigurationError::FileNotFound(_)) => {
                ConfigManager::from_defaults(env.as_deref().unwrap_or("development"))
            }
            Err(e) => return Err(e.into()),
        },
    };

    let mut config = manager.config().clone();
    if let Some(max_concurrent) = cli.max_concurrent {
        config.scheduler.max_concurrent = max_concurrent;
    }
    if let Some(free_buffer_percent) = cli.free_buffer_percent {
        config.scheduler.free_buffer_percent = free_buffer_percent;
    }
    if let Some(poll_interval_seconds) = cli.poll_interval_seconds {
        config.scheduler.poll_interval_seconds = poll_interval_seconds;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(env) = &cli.environment {
        std::env::set_var("RELOCATOR_ENV", env);
    }
    init_structured_logging();

    let config = load_config(&cli)?;

    let requests_raw = std::fs::read_to_string(&cli.requests)
        .with_context(|| format!("reading requests file {}", cli.requests.display()))?;
    let requests: Vec<MigrationRequest> =
        serde_json::from_str(&requests_raw).context("parsing migration requests")?;

    let inventory_raw = std::fs::read_to_string(&cli.inventory)
        .with_context(|| format!("reading inventory file {}", cli.inventory.display()))?;
    let inventory: InventorySnapshot =
        serde_json::from_str(&inventory_raw).context("parsing inventory snapshot")?;

    let provider = Arc::new(InMemoryProvider::new(inventory));

    // Connectivity is the one fatal failure class; everything after this
    // point degrades per item instead of aborting
    if let Err(e) = probe_endpoints(provider.as_ref(), &requests).await {
        error!(error = %e, "Provider connectivity probe failed");
        return Err(e.into());
    }

    let sink: Arc<dyn NotificationSink> = if config.notifications.enabled {
        Arc::new(LoggingNotificationSink)
    } else {
        Arc::new(NullNotificationSink)
    };

    let scheduler = MigrationScheduler::new(provider, sink, config.scheduler.clone());
    let items = scheduler.run(requests).await?;
    let report = RunReport::from_items(&items);

    let rendered = serde_json::to_string_pretty(&report)?;
    match &cli.report {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(report = %path.display(), "Report written");
        }
        None => println!("{rendered}"),
    }

    info!(
        succeeded = report.succeeded_count(),
        errored = report.error_count(),
        "Run finished"
    );
    process::exit(report.exit_code());
}
