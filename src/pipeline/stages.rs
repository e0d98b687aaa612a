// Stage contract: ingest -> validate -> transform -> load.
//
// Every stage produces a StageReport. A stage refuses to start unless the
// previous report is a success; that refusal is a fatal error and halts
// the run. The ingest stage itself never errors: a failed or empty fetch
// is reported as status Error so the validate stage stops the run.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::retry::RetryPolicy;
use crate::connectors::traits::Connector;
use crate::connectors::FirmsRequest;
use crate::db::models::Hotspot;
use crate::db::Database;
use crate::ingest::{self, NormalizeOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ingest,
    Validate,
    Transform,
    Load,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Validate => "validate",
            Stage::Transform => "transform",
            Stage::Load => "load",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    pub records: usize,
    pub invalid_records: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StageReport {
    pub fn success(stage: Stage, records: usize) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            records,
            invalid_records: 0,
            timestamp: Utc::now(),
            message: None,
        }
    }

    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Error,
            records: 0,
            invalid_records: 0,
            timestamp: Utc::now(),
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Success
    }
}

/// Fail unless `previous` succeeded.
pub fn require_success(previous: &StageReport, next: Stage) -> Result<()> {
    if !previous.is_success() {
        anyhow::bail!(
            "{} stage failed ({}); {} cancelled",
            previous.stage,
            previous.message.as_deref().unwrap_or("no details"),
            next
        );
    }
    Ok(())
}

/// Fetch and normalize one window. A fresh connector is built per attempt
/// since a run always closes the one it was given.
pub async fn ingest<F>(
    make_connector: &F,
    request: &FirmsRequest,
    options: &NormalizeOptions,
    output_dir: &Path,
    retry: &RetryPolicy,
) -> (StageReport, Vec<Hotspot>)
where
    F: Fn() -> Box<dyn Connector>,
{
    let outcome = retry
        .run(Stage::Ingest.as_str(), move |_| async move {
            let mut connector = make_connector();
            ingest::run(connector.as_mut(), request, options, output_dir).await
        })
        .await;

    match outcome {
        Ok(run) if run.hotspots.is_empty() => {
            warn!("Ingestion returned no hotspots");
            (StageReport::error(Stage::Ingest, "no records ingested"), Vec::new())
        }
        Ok(run) => {
            let mut report = StageReport::success(Stage::Ingest, run.hotspots.len());
            report.invalid_records = run.skipped;
            (report, run.hotspots)
        }
        Err(e) => {
            warn!(error = %e, "Ingestion failed");
            (StageReport::error(Stage::Ingest, format!("{e:#}")), Vec::new())
        }
    }
}

/// Gate on a successful non-empty ingest. Every ingested record counts as
/// valid; row-level problems were already dropped during normalization.
pub fn validate(previous: &StageReport, hotspots: &[Hotspot]) -> Result<StageReport> {
    require_success(previous, Stage::Validate)?;
    if previous.records == 0 || hotspots.is_empty() {
        anyhow::bail!("No records to validate");
    }
    info!(records = hotspots.len(), "Validation passed");
    Ok(StageReport::success(Stage::Validate, hotspots.len()))
}

/// Pass-through; biome / land-use enrichment would slot in here.
pub fn transform(
    previous: &StageReport,
    hotspots: Vec<Hotspot>,
) -> Result<(StageReport, Vec<Hotspot>)> {
    require_success(previous, Stage::Transform)?;
    Ok((StageReport::success(Stage::Transform, hotspots.len()), hotspots))
}

pub async fn load(
    previous: &StageReport,
    db: &dyn Database,
    hotspots: &[Hotspot],
    retry: &RetryPolicy,
) -> Result<StageReport> {
    require_success(previous, Stage::Load)?;
    let saved = retry
        .run(Stage::Load.as_str(), move |_| ingest::load(db, hotspots))
        .await?;
    Ok(StageReport::success(Stage::Load, saved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Vec<Hotspot> {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        vec![Hotspot::new(-3.1, -60.0, date, 80, "VIIRS").with_id("FIRMS_0000000000000001")]
    }

    #[test]
    fn validate_refuses_after_failed_ingest() {
        let failed = StageReport::error(Stage::Ingest, "no records ingested");
        let err = validate(&failed, &[]).unwrap_err();
        assert!(err.to_string().contains("validate cancelled"));
    }

    #[test]
    fn reports_serialize_lowercase() {
        let json = serde_json::to_value(StageReport::success(Stage::Load, 3)).unwrap();
        assert_eq!(json["stage"], "load");
        assert_eq!(json["status"], "success");
        assert_eq!(json["records"], 3);
        assert!(json.get("message").is_none());

        let json = serde_json::to_value(StageReport::error(Stage::Ingest, "boom")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "boom");
    }

    #[test]
    fn validate_rejects_zero_records() {
        let ingested = StageReport::success(Stage::Ingest, 0);
        assert!(validate(&ingested, &[]).is_err());
    }

    #[test]
    fn stages_chain_on_success() {
        let hotspots = sample();
        let ingested = StageReport::success(Stage::Ingest, hotspots.len());
        let validated = validate(&ingested, &hotspots).unwrap();
        assert_eq!(validated.records, 1);
        assert_eq!(validated.invalid_records, 0);

        let (transformed, out) = transform(&validated, hotspots.clone()).unwrap();
        assert!(transformed.is_success());
        assert_eq!(out, hotspots);
    }

    #[tokio::test]
    async fn load_persists_and_reports_count() {
        let db = crate::db::open_sqlite_in_memory().unwrap();
        let previous = StageReport::success(Stage::Transform, 1);
        let report = load(
            &previous,
            db.as_ref(),
            &sample(),
            &RetryPolicy::new(0, std::time::Duration::ZERO),
        )
        .await
        .unwrap();
        assert_eq!(report.stage, Stage::Load);
        assert_eq!(report.records, 1);
        assert_eq!(db.count_hotspots().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn load_refuses_after_failed_transform() {
        let db = crate::db::open_sqlite_in_memory().unwrap();
        let previous = StageReport::error(Stage::Transform, "boom");
        let result = load(&previous, db.as_ref(), &sample(), &RetryPolicy::default()).await;
        assert!(result.is_err());
        assert_eq!(db.count_hotspots().await.unwrap(), 0);
    }
}
