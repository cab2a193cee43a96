//! Roster segment worker
//!
//! Keeps segment membership up to date by sweeping every stored segment,
//! once or on a fixed interval.

use anyhow::Result;
use roster_sdk::{SegmentRunReport, SegmentSynchronizer};
use roster_worker::config::{LogFormat, WorkerConfig};
use roster_worker::engine;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = WorkerConfig::load()?;

    // Initialize tracing
    init_tracing(&config)?;
    info!("Loaded configuration: {:?}", config);

    // Initialize segment engine
    let engine = engine::init_engine(&config).await?;
    let synchronizer = engine.synchronizer();
    info!("Segment engine initialized");

    if config.run_once {
        sweep(&synchronizer).await;
        return Ok(());
    }

    let mut ticker = interval(config.sync.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        interval_secs = config.sync.interval_secs,
        "Running segment sweeps on an interval"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => sweep(&synchronizer).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(config: &WorkerConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.default_filter().into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}

async fn sweep(synchronizer: &SegmentSynchronizer) {
    let reports = match synchronizer.sync_all().await {
        Ok(reports) => reports,
        Err(e) => {
            error!(error = %e, "Segment sweep failed");
            return;
        }
    };

    for report in &reports {
        match report {
            SegmentRunReport::Synced {
                segment_id,
                joined,
                left,
                dispatch_failures,
            } => info!(
                segment_id = %segment_id,
                joined = joined.len(),
                left = left.len(),
                dispatch_failures,
                "Segment updated"
            ),
            SegmentRunReport::Skipped { segment_id, reason } => {
                warn!(segment_id = %segment_id, reason = %reason, "Segment skipped")
            }
            SegmentRunReport::Failed { segment_id, error } => {
                error!(segment_id = %segment_id, error = %error, "Segment failed")
            }
        }
    }
}
