//! # Scaling Reconciler
//!
//! Command-line driver that reconciles a manifest of scheduled scaling
//! actions and container CORS policies against AWS.
//!
//! ## Usage
//!
//! ```bash
//! # Create, update, replace or delete resources to match the manifest
//! scaling-reconciler apply --manifest resources.yaml --state state.json
//!
//! # Drop recorded resources that no longer exist remotely
//! scaling-reconciler refresh --state state.json
//!
//! # Delete every recorded resource
//! scaling-reconciler destroy --state state.json
//!
//! # Adopt an existing scheduled action under an address
//! scaling-reconciler import scheduled_action web-morning web-morning-ecs-service/prod/web
//!
//! # Print Prometheus metrics for the run once it finishes
//! scaling-reconciler apply --manifest resources.yaml --print-metrics
//! ```
//!
//! Retry pacing, region and log level come from environment variables
//! (see [`ReconcilerConfig`]).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scaling_reconciler::config::ReconcilerConfig;
use scaling_reconciler::manifest::{Manifest, ResourceKind, StateFile};
use scaling_reconciler::metrics;
use scaling_reconciler::provider::aws::{load_sdk_config, AwsApplicationAutoScaling, AwsMediaStore};
use scaling_reconciler::runner::{Change, Runner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Reconcile scheduled scaling actions and CORS policies
#[derive(Parser)]
#[command(name = "scaling-reconciler")]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ", built ", env!("BUILD_DATETIME"), ")"),
    about = "Reconcile scheduled scaling actions and CORS policies",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// State file recording applied resources
    #[arg(short, long, global = true, default_value = "scaling-state.json")]
    state: PathBuf,

    /// AWS region (defaults to AWS_REGION or the SDK default chain)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Print the Prometheus text exposition after the command finishes
    #[arg(long, global = true)]
    print_metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Converge remote resources onto a manifest
    Apply {
        /// YAML manifest of declared resources
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Re-read recorded resources, dropping the ones that are gone
    Refresh,
    /// Delete every recorded resource
    Destroy,
    /// Record an existing remote resource under an address
    Import {
        #[arg(value_enum)]
        kind: ResourceKind,
        /// Address to record the resource under
        address: String,
        /// Remote identifier (container name, or `<name>-<namespace>-<resource-id>`)
        id: String,
    },
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("scaling_reconciler={log_level}").into()),
        )
        .init();
}

fn print_changes(changes: &[Change]) {
    if changes.is_empty() {
        println!("No changes. Remote resources match the manifest.");
        return;
    }
    for change in changes {
        println!("{:<8} {} ({})", change.transition, change.address, change.kind);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ReconcilerConfig::from_env();
    init_tracing(&config.log_level);

    if config.enable_metrics {
        metrics::register_metrics()?;
    }

    let region = cli.region.clone().or_else(|| config.region.clone());
    let sdk_config = load_sdk_config(region.as_deref()).await;
    let runner = Runner::new(
        Arc::new(AwsApplicationAutoScaling::new(&sdk_config)),
        Arc::new(AwsMediaStore::new(&sdk_config)),
        config.retry_policy(),
    );

    let mut state = StateFile::load(&cli.state)?;
    info!(
        state_file = %cli.state.display(),
        resources = state.resources.len(),
        "Loaded state"
    );

    let outcome = match &cli.command {
        Commands::Apply { manifest } => {
            let manifest = Manifest::load(manifest)?;
            runner
                .apply(&manifest, &mut state)
                .await
                .map(|changes| print_changes(&changes))
                .context("Apply failed")
        }
        Commands::Refresh => runner
            .refresh(&mut state)
            .await
            .map(|dropped| {
                for address in dropped {
                    println!("removed  {address} (no longer exists)");
                }
            })
            .context("Refresh failed"),
        Commands::Destroy => runner
            .destroy(&mut state)
            .await
            .map(|changes| print_changes(&changes))
            .context("Destroy failed"),
        Commands::Import { kind, address, id } => {
            match runner.import(&mut state, address, *kind, id).await {
                Ok(true) => {
                    println!("imported {address} ({kind})");
                    Ok(())
                }
                Ok(false) => Err(anyhow::anyhow!("No {kind} found with id {id}")),
                Err(e) => Err(e).context("Import failed"),
            }
        }
    };

    // Persist whatever completed, even on failure
    state
        .save(&cli.state)
        .with_context(|| format!("Failed to save state to {}", cli.state.display()))?;

    if cli.print_metrics {
        if config.enable_metrics {
            print!("{}", metrics::gather_metrics()?);
        } else {
            warn!("--print-metrics ignored because ENABLE_METRICS is false");
        }
    }

    outcome
}
