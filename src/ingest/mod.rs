// Ingestion — fetch a FIRMS window, persist the run files, normalize.
//
// A run writes two files per window into the output directory:
//   nasa_firms_<start>_to_<end>.csv   raw provider body
//   nasa_firms_<start>_to_<end>.json  normalized hotspot candidates
// Loading into the store is a separate step (`load`) so the pipeline can
// validate in between.

pub mod normalize;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::connectors::traits::{Connector, FetchResult};
use crate::connectors::FirmsRequest;
use crate::db::models::Hotspot;
use crate::db::Database;

pub use normalize::{normalize_csv, NormalizeOptions, NormalizeReport};

/// Ingest-state keys written by `load`.
pub const LAST_INGEST_AT: &str = "last_ingest_at";
pub const LAST_INGEST_RECORDS: &str = "last_ingest_records";

/// Outcome of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub raw_path: PathBuf,
    pub processed_path: PathBuf,
    pub hotspots: Vec<Hotspot>,
    pub skipped: usize,
}

/// Fetch, persist and normalize one request window.
///
/// The connector is closed before returning, whatever the outcome.
pub async fn run(
    connector: &mut dyn Connector,
    request: &FirmsRequest,
    options: &NormalizeOptions,
    output_dir: &Path,
) -> Result<IngestReport> {
    let result = run_inner(connector, request, options, output_dir).await;
    connector.close().await;
    result
}

async fn run_inner(
    connector: &mut dyn Connector,
    request: &FirmsRequest,
    options: &NormalizeOptions,
    output_dir: &Path,
) -> Result<IngestReport> {
    if !connector.connect().await {
        anyhow::bail!("Failed to connect to {}", connector.metadata().name);
    }

    info!(
        date_range = %request.date_range(),
        satellite = %request.satellite,
        "Fetching fire hotspots"
    );
    let result = connector.fetch_data(&request.to_parameters()).await;

    if let Some(message) = result.error() {
        anyhow::bail!("Fetch failed: {message}");
    }
    if !connector.validate_data(&result) {
        anyhow::bail!("Fetched data failed structural validation");
    }

    let text = match result {
        FetchResult::Csv(text) => text,
        other => anyhow::bail!(
            "Unsupported format for ingestion: {}",
            other.format().map(|f| f.as_str()).unwrap_or("unknown")
        ),
    };

    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    let stem = run_file_stem(request);
    let raw_path = output_dir.join(format!("{stem}.csv"));
    std::fs::write(&raw_path, &text)
        .with_context(|| format!("Failed to write {}", raw_path.display()))?;

    let report = normalize_csv(&text, options);
    if report.skipped > 0 {
        warn!(skipped = report.skipped, "Skipped malformed FIRMS rows");
    }

    let processed_path = output_dir.join(format!("{stem}.json"));
    let json = serde_json::to_string_pretty(&report.hotspots)?;
    std::fs::write(&processed_path, json)
        .with_context(|| format!("Failed to write {}", processed_path.display()))?;

    info!(
        records = report.hotspots.len(),
        skipped = report.skipped,
        raw = %raw_path.display(),
        "Ingestion run complete"
    );

    Ok(IngestReport {
        raw_path,
        processed_path,
        hotspots: report.hotspots,
        skipped: report.skipped,
    })
}

/// `nasa_firms_<start>_to_<end>`
pub fn run_file_stem(request: &FirmsRequest) -> String {
    format!(
        "nasa_firms_{}_to_{}",
        request.start_date.format("%Y-%m-%d"),
        request.end_date.format("%Y-%m-%d")
    )
}

/// Persist candidates in one batch and record the run in ingest state.
pub async fn load(db: &dyn Database, hotspots: &[Hotspot]) -> Result<usize> {
    let saved = db
        .save_batch(hotspots)
        .await
        .context("Failed to load hotspots")?;

    db.set_ingest_state(LAST_INGEST_AT, &Utc::now().to_rfc3339())
        .await?;
    db.set_ingest_state(LAST_INGEST_RECORDS, &saved.to_string())
        .await?;

    info!(saved, "Hotspots loaded");
    Ok(saved)
}
