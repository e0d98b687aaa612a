use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::connectors::firms::DEFAULT_FIRMS_BASE_URL;
use crate::query::criteria::BoundingBox;

/// Approximate bounding box of the Legal Amazon (min_lon, min_lat, max_lon, max_lat).
pub const DEFAULT_INGEST_BBOX: &str = "-73.9904,-18.0414,-44.0005,5.2672";

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// NASA FIRMS map key (FIRMS_API_KEY)
    pub firms_api_key: String,
    pub firms_base_url: String,
    pub db_path: String,
    /// PostgreSQL connection URL (when set and starts with postgres://, uses Postgres backend)
    pub database_url: Option<String>,
    /// Where raw CSV and processed JSON files land for each ingest run
    pub output_dir: PathBuf,
    /// Timeout applied to every provider HTTP call
    pub http_timeout: Duration,
    /// Satellite label requested from the provider and stamped on each hotspot
    pub satellite: String,
    /// Area requested during ingestion
    pub ingest_area: BoundingBox,
    /// How many days back an ingest run covers
    pub lookback_days: u32,
    /// Biome stamped on ingested hotspots until real enrichment exists
    pub default_biome: Option<String>,
    /// Retries per pipeline stage after the first attempt
    pub pipeline_retries: u32,
    pub pipeline_retry_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the FIRMS key, which only ingest
    /// commands need (see `require_firms`).
    pub fn load() -> Result<Self> {
        let ingest_area = match env::var("GEIH_INGEST_BBOX") {
            Ok(text) => BoundingBox::parse(&text).context("Invalid GEIH_INGEST_BBOX")?,
            Err(_) => BoundingBox::parse(DEFAULT_INGEST_BBOX)?,
        };

        Ok(Self {
            firms_api_key: env::var("FIRMS_API_KEY").unwrap_or_default(),
            firms_base_url: env::var("FIRMS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_FIRMS_BASE_URL.to_string()),
            db_path: env::var("GEIH_DB_PATH").unwrap_or_else(|_| "./geih.db".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            output_dir: env::var("GEIH_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/raw")),
            http_timeout: Duration::from_secs(env_number("GEIH_HTTP_TIMEOUT_SECS", 60)?),
            satellite: env::var("GEIH_SATELLITE").unwrap_or_else(|_| "VIIRS".to_string()),
            ingest_area,
            lookback_days: env_number("GEIH_LOOKBACK_DAYS", 7)?,
            default_biome: env::var("GEIH_DEFAULT_BIOME")
                .ok()
                .filter(|b| !b.trim().is_empty()),
            pipeline_retries: env_number("GEIH_PIPELINE_RETRIES", 3)?,
            pipeline_retry_delay: Duration::from_secs(env_number(
                "GEIH_PIPELINE_RETRY_DELAY_SECS",
                300,
            )?),
        })
    }

    /// Check that the FIRMS API key is configured.
    /// Call this before any operation that talks to the provider.
    pub fn require_firms(&self) -> Result<()> {
        if self.firms_api_key.is_empty() {
            anyhow::bail!(
                "FIRMS_API_KEY not set. Add it to your .env file.\n\
                 Request a map key at https://firms.modaps.eosdis.nasa.gov/api/map_key/"
            );
        }
        Ok(())
    }

    /// True when DATABASE_URL selects the PostgreSQL backend.
    pub fn uses_postgres(&self) -> bool {
        self.database_url
            .as_deref()
            .is_some_and(|url| url.starts_with("postgres://") || url.starts_with("postgresql://"))
    }
}

/// Read a numeric env var, falling back to `default` when unset.
fn env_number<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(text) => text
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a number, got '{text}'")),
        Err(_) => Ok(default),
    }
}
