mod cli;

use acled_sync_core::{SyncConfig, SyncEngine, SyncTrigger};
use acled_sync_integrations::{ArcGisFeatureLayer, GlobalFeed, RegionFeed};
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let cmd = cli.command.unwrap_or(Commands::Run { past_due: false });
    match cmd {
        Commands::Run { past_due } => {
            let engine = build_engine()?;
            let report = engine.run(SyncTrigger::Scheduled { past_due }).await?;
            tracing::info!(report = %serde_json::to_string(&report)?, "run report");
        }
        Commands::Schedule { every_minutes } => {
            anyhow::ensure!(every_minutes > 0, "--every-minutes must be > 0");
            let engine = build_engine()?;
            let mut ticker = tokio::time::interval(Duration::from_secs(every_minutes * 60));
            loop {
                ticker.tick().await;
                // Best-effort tick; a failed run waits for the next one.
                match engine.run(SyncTrigger::Scheduled { past_due: false }).await {
                    Ok(report) => {
                        tracing::info!(report = %serde_json::to_string(&report)?, "run report")
                    }
                    Err(e) => tracing::warn!(error = %e, "sync run failed"),
                }
            }
        }
        Commands::Reset => {
            let engine = build_engine()?;
            let summary = engine.reset().await?;
            tracing::info!(deleted = summary.succeeded, failed = summary.failed, "layer reset");
        }
        Commands::Config => {
            let cfg = SyncConfig::from_env()?;
            println!("{}", serde_json::to_string_pretty(&cfg.redacted())?);
        }
    }

    Ok(())
}

fn build_engine() -> anyhow::Result<SyncEngine> {
    let cfg = SyncConfig::from_env()?;
    let global = Arc::new(GlobalFeed::new(
        cfg.api_base.clone(),
        cfg.api_key.clone(),
        cfg.api_email.clone(),
    ));
    let region = Arc::new(RegionFeed::new(cfg.region_artifact_url.clone()));
    let store = Arc::new(ArcGisFeatureLayer::new(
        cfg.layer_url.clone(),
        cfg.portal_url.clone(),
    ));
    Ok(SyncEngine::new(
        global,
        region,
        store,
        cfg.credentials,
        cfg.lookback_days,
        cfg.batch_size,
    ))
}

/// JSON logs to stdout; `RUST_LOG` overrides the default `info` filter.
fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt::layer().json().with_target(true);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing already initialized: {e}"))?;
    Ok(())
}
