// Data models — Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so the connector, ingestion and web layers can
// use them without depending on rusqlite or sqlx directly.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical text form for timestamps stored in SQLite.
///
/// Fixed-width with microseconds so lexical comparison in SQL matches
/// chronological order. Anything finer than a microsecond is dropped on
/// write, which is why query bounds are limited to microseconds too.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// A single satellite-detected fire / thermal anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Date and time of the satellite pass (UTC, no offset).
    pub acquisition_date: NaiveDateTime,
    /// Provider confidence, nominally 0-100. Not clamped.
    pub confidence: i32,
    /// Provider / satellite label, e.g. "MODIS" or "VIIRS"
    pub source: String,
    /// Brightness temperature (Kelvin)
    pub brightness: Option<f64>,
    /// Fire Radiative Power (MW)
    pub frp: Option<f64>,
    pub biome: Option<String>,
    pub land_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Hotspot {
    /// Build an unsaved hotspot from the required fields.
    pub fn new(
        latitude: f64,
        longitude: f64,
        acquisition_date: NaiveDateTime,
        confidence: i32,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            latitude,
            longitude,
            acquisition_date,
            confidence,
            source: source.into(),
            brightness: None,
            frp: None,
            biome: None,
            land_use: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_brightness(mut self, brightness: f64) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn with_frp(mut self, frp: f64) -> Self {
        self.frp = Some(frp);
        self
    }

    pub fn with_biome(mut self, biome: impl Into<String>) -> Self {
        self.biome = Some(biome.into());
        self
    }

    pub fn with_land_use(mut self, land_use: impl Into<String>) -> Self {
        self.land_use = Some(land_use.into());
        self
    }

    /// True when both records describe the same detection, ignoring the
    /// store-assigned id and timestamps.
    pub fn same_detection(&self, other: &Hotspot) -> bool {
        self.latitude == other.latitude
            && self.longitude == other.longitude
            && self.acquisition_date == other.acquisition_date
            && self.confidence == other.confidence
            && self.source == other.source
            && self.brightness == other.brightness
            && self.frp == other.frp
            && self.biome == other.biome
            && self.land_use == other.land_use
    }
}

/// Render a timestamp in the fixed-width stored form.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp previously written with [`format_timestamp`].
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .with_context(|| format!("Invalid stored timestamp: {text}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32, micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 15)
            .unwrap()
            .and_hms_micro_opt(h, m, s, micro)
            .unwrap()
    }

    #[test]
    fn timestamp_text_roundtrip() {
        let t = ts(14, 30, 0, 250);
        let text = format_timestamp(&t);
        assert_eq!(text, "2025-05-15T14:30:00.000250");
        assert_eq!(parse_timestamp(&text).unwrap(), t);
    }

    #[test]
    fn timestamp_text_sorts_chronologically() {
        let earlier = format_timestamp(&ts(9, 59, 59, 999_999));
        let later = format_timestamp(&ts(10, 0, 0, 0));
        assert!(earlier < later);
    }

    #[test]
    fn serializes_without_unset_timestamps() {
        let h = Hotspot::new(-9.45678, -56.78901, ts(14, 30, 0, 0), 85, "VIIRS")
            .with_id("FIRMS_12345678");
        let json = serde_json::to_value(&h).unwrap();
        assert_eq!(json["id"], "FIRMS_12345678");
        assert_eq!(json["acquisition_date"], "2025-05-15T14:30:00");
        assert!(json.get("created_at").is_none());
        assert!(json["biome"].is_null());
    }

    #[test]
    fn same_detection_ignores_identity() {
        let a = Hotspot::new(1.0, 2.0, ts(1, 2, 3, 0), 50, "MODIS").with_frp(3.5);
        let b = a.clone().with_id("x");
        assert!(a.same_detection(&b));
        assert!(!a.same_detection(&b.with_biome("Cerrado")));
    }
}
