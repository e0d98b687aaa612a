// Orchestration pipeline — daily ingest -> validate -> transform -> load.
//
// `run_once` executes the four stages for a window ending today and stops
// at the first stage that refuses to start. `watch` repeats that once a day
// until Ctrl+C.

pub mod retry;
pub mod stages;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::connectors::traits::Connector;
use crate::connectors::FirmsRequest;
use crate::db::Database;
use crate::ingest::NormalizeOptions;
use crate::query::BoundingBox;

pub use retry::RetryPolicy;
pub use stages::{Stage, StageReport, StageStatus};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Everything a run needs besides the store and the connector.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub area: BoundingBox,
    pub satellite: String,
    pub lookback_days: u32,
    pub options: NormalizeOptions,
    pub output_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            area: config.ingest_area,
            satellite: config.satellite.clone(),
            lookback_days: config.lookback_days,
            options: NormalizeOptions::new(config.satellite.clone())
                .with_biome(config.default_biome.clone()),
            output_dir: config.output_dir.clone(),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn request_for(&self, today: NaiveDate) -> FirmsRequest {
        FirmsRequest::last_days(self.area, &self.satellite, self.lookback_days, today)
    }
}

/// Run all four stages once. Returns the reports of every stage that ran;
/// a stage refusing to start is an error.
pub async fn run_once<F>(
    settings: &PipelineSettings,
    db: &dyn Database,
    make_connector: &F,
    today: NaiveDate,
) -> Result<Vec<StageReport>>
where
    F: Fn() -> Box<dyn Connector>,
{
    let request = settings.request_for(today);
    info!(date_range = %request.date_range(), "Pipeline run starting");

    let (ingested, hotspots) = stages::ingest(
        make_connector,
        &request,
        &settings.options,
        &settings.output_dir,
        &settings.retry,
    )
    .await;
    info!(stage = %ingested.stage, status = ?ingested.status, records = ingested.records, "Stage finished");

    let validated = stages::validate(&ingested, &hotspots)?;
    let (transformed, hotspots) = stages::transform(&validated, hotspots)?;
    let loaded = stages::load(&transformed, db, &hotspots, &settings.retry).await?;
    info!(records = loaded.records, "Pipeline run complete");

    Ok(vec![ingested, validated, transformed, loaded])
}

/// Run the pipeline now and then every 24 hours until Ctrl+C.
/// A failed run is logged and does not stop the schedule.
pub async fn watch<F>(
    settings: &PipelineSettings,
    db: Arc<dyn Database>,
    make_connector: F,
) -> Result<()>
where
    F: Fn() -> Box<dyn Connector>,
{
    watch_until(settings, db, make_connector, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// Like [`watch`], but stops when `shutdown` resolves. The shutdown future
/// is polled during runs as well as between them, so a run in progress is
/// abandoned at its next await point.
pub async fn watch_until<F, S>(
    settings: &PipelineSettings,
    db: Arc<dyn Database>,
    make_connector: F,
    shutdown: S,
) -> Result<()>
where
    F: Fn() -> Box<dyn Connector>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(DAY);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => break,
        }

        let today = Utc::now().date_naive();
        tokio::select! {
            result = run_once(settings, db.as_ref(), &make_connector, today) => {
                if let Err(e) = result {
                    error!(error = %e, "Pipeline run failed");
                }
            }
            _ = &mut shutdown => {
                warn!("Shutdown requested during a run; abandoning it");
                break;
            }
        }
    }
    info!("Shutting down pipeline watch");
    Ok(())
}
