// Raw provider CSV -> Hotspot candidates.
//
// Pure and deterministic: the same CSV text and options always produce the
// same hotspots, ids included. Rows that fail to parse are skipped and
// counted rather than aborting the batch.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::db::models::Hotspot;

/// FIRMS CSV columns we read. VIIRS files carry `bright_ti4`, MODIS files
/// carry `brightness`; everything is optional so missing columns surface
/// as per-row parse failures instead of a whole-file error.
#[derive(Debug, Deserialize)]
struct RawFirmsRow {
    latitude: Option<String>,
    longitude: Option<String>,
    acq_date: Option<String>,
    acq_time: Option<String>,
    confidence: Option<String>,
    bright_ti4: Option<String>,
    brightness: Option<String>,
    frp: Option<String>,
}

/// Settings applied to every normalized row.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Stamped into `Hotspot::source`
    pub source_label: String,
    /// Prefix of generated ids, e.g. "FIRMS"
    pub id_prefix: String,
    pub biome: Option<String>,
}

impl NormalizeOptions {
    pub fn new(source_label: impl Into<String>) -> Self {
        Self {
            source_label: source_label.into(),
            id_prefix: "FIRMS".to_string(),
            biome: None,
        }
    }

    pub fn with_biome(mut self, biome: Option<String>) -> Self {
        self.biome = biome;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub hotspots: Vec<Hotspot>,
    pub skipped: usize,
}

impl NormalizeReport {
    /// Data rows seen, kept or not.
    pub fn rows(&self) -> usize {
        self.hotspots.len() + self.skipped
    }
}

/// Convert FIRMS CSV text into hotspot candidates.
pub fn normalize_csv(text: &str, options: &NormalizeOptions) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            debug!(error = %e, "CSV header unreadable, nothing to normalize");
            return report;
        }
    };

    for (index, record) in reader.records().enumerate() {
        let parsed = record
            .ok()
            .and_then(|record| normalize_record(index, &record, &headers, options));
        match parsed {
            Some(hotspot) => report.hotspots.push(hotspot),
            None => {
                debug!(row = index + 1, "Skipping malformed FIRMS row");
                report.skipped += 1;
            }
        }
    }

    report
}

fn normalize_record(
    index: usize,
    record: &StringRecord,
    headers: &StringRecord,
    options: &NormalizeOptions,
) -> Option<Hotspot> {
    let raw: RawFirmsRow = record.deserialize(Some(headers)).ok()?;

    let latitude = parse_f64(raw.latitude.as_deref())?;
    let longitude = parse_f64(raw.longitude.as_deref())?;
    let acquisition_date = parse_acquisition(raw.acq_date.as_deref()?, raw.acq_time.as_deref())?;
    let confidence = parse_confidence(raw.confidence.as_deref())?;

    let brightness = match non_empty(raw.bright_ti4.as_deref()).or(non_empty(raw.brightness.as_deref())) {
        Some(text) => text.parse::<f64>().ok()?,
        None => 0.0,
    };
    let frp = match non_empty(raw.frp.as_deref()) {
        Some(text) => text.parse::<f64>().ok()?,
        None => 0.0,
    };

    let mut hotspot = Hotspot::new(
        latitude,
        longitude,
        acquisition_date,
        confidence,
        options.source_label.clone(),
    )
    .with_id(row_id(&options.id_prefix, index, record))
    .with_brightness(brightness)
    .with_frp(frp);
    hotspot.biome = options.biome.clone();

    Some(hotspot)
}

/// `<prefix>_` + 16 hex chars of a v5 UUID over the row index and content.
fn row_id(prefix: &str, index: usize, record: &StringRecord) -> String {
    let fields: Vec<&str> = record.iter().collect();
    let name = format!("{index}|{}", fields.join(","));
    let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
    let hex = uuid.simple().to_string();
    format!("{prefix}_{}", &hex[..16])
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    non_empty(value)?.parse::<f64>().ok()
}

/// `acq_date` (YYYY-MM-DD) plus `acq_time` (HHMM). Providers sometimes drop
/// leading zeros ("45" means 00:45), so short times are left-padded.
fn parse_acquisition(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = match non_empty(time) {
        Some(text) => {
            if text.len() > 4 || !text.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let padded = format!("{text:0>4}");
            NaiveTime::parse_from_str(&padded, "%H%M").ok()?
        }
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

/// Numeric confidence, truncated toward zero ("85.7" -> 85). VIIRS files use
/// the letter classes low / nominal / high, mapped to 30 / 60 / 90.
/// An absent column counts as 0; anything else fails the row.
fn parse_confidence(value: Option<&str>) -> Option<i32> {
    let Some(text) = non_empty(value) else {
        return Some(0);
    };
    match text.to_ascii_lowercase().as_str() {
        "l" | "low" => Some(30),
        "n" | "nominal" => Some(60),
        "h" | "high" => Some(90),
        _ => {
            let number = text.parse::<f64>().ok()?;
            if !number.is_finite() {
                return None;
            }
            Some(number.trunc() as i32)
        }
    }
}
