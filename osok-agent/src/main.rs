//! osok-agent: desired-state reconciliation for cloud resources.
//!
//! This daemon:
//! - Loads the declared objects from a manifest file
//! - Reconciles each object with the provider through its kind's adapter
//! - Finalizes deleted objects and prunes undeclared ones
//! - Persists observed statuses after every pass

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use osok_agent::clients::{CloudClient, CloudConfig, SecretStore};
use osok_agent::{
    AdapterConfig, ApplyReport, Controller, ControllerConfig, Manifest, StatusFile,
    all_reconcilers,
};
use osok_core::{Backoff, RetryPolicy};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// osok agent
#[derive(Parser, Debug)]
#[command(name = "osok-agent", version, about)]
struct Args {
    /// Manifest of declared objects
    #[arg(long, default_value = "manifest.json")]
    manifest: PathBuf,

    /// File the observed statuses are written to
    #[arg(long, default_value = "status.json")]
    status_file: PathBuf,

    /// Seconds between passes over the manifest
    #[arg(long, default_value = "60")]
    resync_interval: u64,

    /// Seconds to wait before revisiting a resource whose create was accepted
    #[arg(long, default_value = "30")]
    requeue_delay: u64,

    /// Seconds between provisioning polls
    #[arg(long, default_value = "60")]
    poll_interval: u64,

    /// Provisioning polls before giving up
    #[arg(long, default_value = "30")]
    poll_attempts: u32,

    /// Seconds between sync rounds when no requeue delay is given
    #[arg(long, default_value = "10")]
    backoff: u64,

    /// Sync rounds per object per pass
    #[arg(long, default_value = "3")]
    max_rounds: u32,

    /// Do not finalize objects that disappear from the manifest
    #[arg(long)]
    no_prune: bool,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// Simulated provider: reads before a new resource settles
    #[arg(long, default_value = "2")]
    settle_reads: u32,

    /// Simulated provider: list calls that miss a new resource
    #[arg(long, default_value = "0")]
    visibility_lag: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osok_agent=info,osok_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting osok-agent");
    info!("Manifest: {}", args.manifest.display());
    info!("Status file: {}", args.status_file.display());

    let cloud = CloudClient::new(CloudConfig {
        settle_reads: args.settle_reads,
        visibility_lag: args.visibility_lag,
    });
    let secrets = SecretStore::new();
    let adapter_config = AdapterConfig {
        requeue_delay: Duration::from_secs(args.requeue_delay),
        poll: RetryPolicy::provisioning()
            .with_max_attempts(args.poll_attempts)
            .with_backoff(Backoff::Fixed(Duration::from_secs(args.poll_interval))),
    };
    let controller = Controller::with_reconcilers(
        ControllerConfig {
            default_backoff: Duration::from_secs(args.backoff),
            max_rounds: args.max_rounds,
            prune: !args.no_prune,
        },
        all_reconcilers(&cloud, &secrets, &adapter_config),
    );
    info!("Managing kinds: {}", controller.kinds().join(", "));

    if args.once {
        let report = run_pass(&controller, &args).await?;
        if !report.failed.is_empty() {
            anyhow::bail!("{} object(s) failed", report.failed.len());
        }
        return Ok(());
    }

    let resync = Duration::from_secs(args.resync_interval);
    loop {
        if let Err(e) = run_pass(&controller, &args).await {
            error!("Pass failed: {:#}", e);
        }

        tokio::select! {
            _ = tokio::time::sleep(resync) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn run_pass(controller: &Controller, args: &Args) -> Result<ApplyReport> {
    let manifest = Manifest::load(&args.manifest)
        .await
        .context("Failed to load manifest")?;
    let mut statuses = StatusFile::load(&args.status_file)
        .await
        .context("Failed to load statuses")?;

    let report = controller.apply(&manifest, &mut statuses).await;

    statuses
        .save(&args.status_file)
        .await
        .context("Failed to save statuses")?;

    for (key, reason) in &report.failed {
        warn!(object = %key, "{}", reason);
    }
    Ok(report)
}
