// Query criteria — the filter value object and its translation into
// predicates.
//
// Every present field becomes one independent predicate; the predicates are
// AND-ed together. The same predicate list is rendered to SQL by the store
// backends and can be evaluated directly against a Hotspot.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::db::models::Hotspot;

/// Axis-aligned longitude/latitude rectangle. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Build a box only when all four coordinates are supplied.
    ///
    /// Partial coordinates mean "no bounding box", not an error.
    pub fn from_parts(
        min_lon: Option<f64>,
        min_lat: Option<f64>,
        max_lon: Option<f64>,
        max_lat: Option<f64>,
    ) -> Option<Self> {
        Some(Self::new(min_lon?, min_lat?, max_lon?, max_lat?))
    }

    /// Parse `"min_lon,min_lat,max_lon,max_lat"`.
    pub fn parse(text: &str) -> Result<Self> {
        let coords = text
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .with_context(|| format!("Invalid coordinate '{}' in bounding box", part.trim()))
            })
            .collect::<Result<Vec<f64>>>()?;

        match coords.as_slice() {
            [min_lon, min_lat, max_lon, max_lat] => {
                Ok(Self::new(*min_lon, *min_lat, *max_lon, *max_lat))
            }
            _ => anyhow::bail!(
                "Bounding box needs 4 comma-separated values (min_lon,min_lat,max_lon,max_lat), got {}",
                coords.len()
            ),
        }
    }

    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        longitude >= self.min_lon
            && longitude <= self.max_lon
            && latitude >= self.min_lat
            && latitude <= self.max_lat
    }
}

/// Filter for hotspot reads. Every field is optional; an absent field places
/// no constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryCriteria {
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub min_confidence: Option<i32>,
    pub source: Option<String>,
    pub biome: Option<String>,
    pub bounding_box: Option<BoundingBox>,
}

/// One AND-ed condition of a hotspot query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    AcquiredFrom(NaiveDateTime),
    AcquiredUntil(NaiveDateTime),
    MinConfidence(i32),
    Source(String),
    Biome(String),
    Within(BoundingBox),
}

/// A value bound into a rendered SQL clause.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Timestamp(NaiveDateTime),
    Int(i32),
    Float(f64),
    Text(String),
}

impl QueryCriteria {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    /// The conjunction this criteria stands for, one predicate per present field.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(start) = self.start_date {
            predicates.push(Predicate::AcquiredFrom(start));
        }
        if let Some(end) = self.end_date {
            predicates.push(Predicate::AcquiredUntil(end));
        }
        if let Some(min) = self.min_confidence {
            predicates.push(Predicate::MinConfidence(min));
        }
        if let Some(ref source) = self.source {
            predicates.push(Predicate::Source(source.clone()));
        }
        if let Some(ref biome) = self.biome {
            predicates.push(Predicate::Biome(biome.clone()));
        }
        if let Some(bbox) = self.bounding_box {
            predicates.push(Predicate::Within(bbox));
        }
        predicates
    }

    /// Evaluate the criteria against a single hotspot.
    pub fn matches(&self, hotspot: &Hotspot) -> bool {
        self.predicates().iter().all(|p| p.matches(hotspot))
    }

    /// Render the criteria as a SQL `WHERE` body plus bound values.
    ///
    /// `placeholder` receives the 1-based parameter index and returns the
    /// backend's marker (`?1` for SQLite, `$1` for PostgreSQL). An empty
    /// criteria renders as `"1=1"` with no values.
    pub fn to_sql<F>(&self, placeholder: F) -> (String, Vec<SqlValue>)
    where
        F: Fn(usize) -> String,
    {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        let mut bind = |column: &str, op: &str, value: SqlValue, clauses: &mut Vec<String>| {
            values.push(value);
            clauses.push(format!("{column} {op} {}", placeholder(values.len())));
        };

        for predicate in self.predicates() {
            match predicate {
                Predicate::AcquiredFrom(ts) => {
                    bind("acquisition_date", ">=", SqlValue::Timestamp(ts), &mut clauses)
                }
                Predicate::AcquiredUntil(ts) => {
                    bind("acquisition_date", "<=", SqlValue::Timestamp(ts), &mut clauses)
                }
                Predicate::MinConfidence(min) => {
                    bind("confidence", ">=", SqlValue::Int(min), &mut clauses)
                }
                Predicate::Source(source) => {
                    bind("source", "=", SqlValue::Text(source), &mut clauses)
                }
                Predicate::Biome(biome) => bind("biome", "=", SqlValue::Text(biome), &mut clauses),
                Predicate::Within(bbox) => {
                    bind("longitude", ">=", SqlValue::Float(bbox.min_lon), &mut clauses);
                    bind("longitude", "<=", SqlValue::Float(bbox.max_lon), &mut clauses);
                    bind("latitude", ">=", SqlValue::Float(bbox.min_lat), &mut clauses);
                    bind("latitude", "<=", SqlValue::Float(bbox.max_lat), &mut clauses);
                }
            }
        }

        if clauses.is_empty() {
            ("1=1".to_string(), values)
        } else {
            (clauses.join(" AND "), values)
        }
    }
}

impl Predicate {
    pub fn matches(&self, hotspot: &Hotspot) -> bool {
        match self {
            Predicate::AcquiredFrom(ts) => hotspot.acquisition_date >= *ts,
            Predicate::AcquiredUntil(ts) => hotspot.acquisition_date <= *ts,
            Predicate::MinConfidence(min) => hotspot.confidence >= *min,
            Predicate::Source(source) => hotspot.source == *source,
            Predicate::Biome(biome) => hotspot.biome.as_deref() == Some(biome.as_str()),
            Predicate::Within(bbox) => bbox.contains(hotspot.longitude, hotspot.latitude),
        }
    }
}

/// Parse a date or datetime filter value.
///
/// Accepts `YYYY-MM-DD` (midnight), `YYYY-MM-DDTHH:MM:SS[.f]`, the same with
/// a space separator, and RFC 3339 with an offset (converted to UTC).
/// Stored timestamps have microsecond resolution, so finer fractions are
/// rejected rather than silently truncated.
pub fn parse_datetime_param(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    let parsed = parse_datetime_text(text).with_context(|| {
        format!("Invalid date '{text}': expected ISO-8601 (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)")
    })?;
    if parsed.nanosecond() % 1_000 != 0 {
        anyhow::bail!("Invalid date '{text}': precision finer than a microsecond is not supported");
    }
    Ok(parsed)
}

fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn sample() -> Hotspot {
        Hotspot::new(-9.5, -56.8, at(15, 14), 85, "VIIRS").with_biome("Amazon Rainforest")
    }

    #[test]
    fn partial_bbox_is_absent() {
        assert!(BoundingBox::from_parts(Some(-60.0), Some(-10.0), Some(-50.0), None).is_none());
        assert!(BoundingBox::from_parts(None, None, None, None).is_none());
        assert_eq!(
            BoundingBox::from_parts(Some(-60.0), Some(-10.0), Some(-50.0), Some(0.0)),
            Some(BoundingBox::new(-60.0, -10.0, -50.0, 0.0))
        );
    }

    #[test]
    fn bbox_parse() {
        let bbox = BoundingBox::parse("-73.9904, -18.0414,-44.0005,5.2672").unwrap();
        assert_eq!(bbox.min_lon, -73.9904);
        assert_eq!(bbox.max_lat, 5.2672);
        assert!(BoundingBox::parse("1,2,3").is_err());
        assert!(BoundingBox::parse("1,2,x,4").is_err());
    }

    #[test]
    fn bbox_edges_are_inclusive() {
        let bbox = BoundingBox::new(-60.0, -10.0, -50.0, 0.0);
        assert!(bbox.contains(-60.0, -10.0));
        assert!(bbox.contains(-50.0, 0.0));
        assert!(!bbox.contains(-49.999, 0.0));
        assert!(!bbox.contains(-55.0, 0.001));
    }

    #[test]
    fn empty_criteria_matches_everything() {
        let criteria = QueryCriteria::default();
        assert!(criteria.is_empty());
        assert!(criteria.matches(&sample()));
        let (sql, values) = criteria.to_sql(|i| format!("?{i}"));
        assert_eq!(sql, "1=1");
        assert!(values.is_empty());
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let criteria = QueryCriteria {
            start_date: Some(at(15, 14)),
            end_date: Some(at(15, 14)),
            ..Default::default()
        };
        assert!(criteria.matches(&sample()));

        let criteria = QueryCriteria {
            start_date: Some(at(15, 15)),
            ..Default::default()
        };
        assert!(!criteria.matches(&sample()));
    }

    #[test]
    fn biome_filter_never_matches_missing_biome() {
        let criteria = QueryCriteria {
            biome: Some("Cerrado".to_string()),
            ..Default::default()
        };
        let mut h = sample();
        h.biome = None;
        assert!(!criteria.matches(&h));
    }

    #[test]
    fn renders_numbered_placeholders_in_field_order() {
        let criteria = QueryCriteria {
            start_date: Some(at(1, 0)),
            min_confidence: Some(80),
            source: Some("VIIRS".to_string()),
            bounding_box: Some(BoundingBox::new(-60.0, -10.0, -50.0, 0.0)),
            ..Default::default()
        };
        let (sql, values) = criteria.to_sql(|i| format!("${i}"));
        assert_eq!(
            sql,
            "acquisition_date >= $1 AND confidence >= $2 AND source = $3 AND \
             longitude >= $4 AND longitude <= $5 AND latitude >= $6 AND latitude <= $7"
        );
        assert_eq!(values.len(), 7);
        assert_eq!(values[1], SqlValue::Int(80));
        assert_eq!(values[4], SqlValue::Float(-50.0));
    }

    #[test]
    fn parses_supported_date_forms() {
        assert_eq!(parse_datetime_param("2025-05-15").unwrap(), at(15, 0));
        assert_eq!(parse_datetime_param("2025-05-15T14:00:00").unwrap(), at(15, 14));
        assert_eq!(parse_datetime_param("2025-05-15 14:00:00").unwrap(), at(15, 14));
        assert_eq!(
            parse_datetime_param("2025-05-15T16:00:00+02:00").unwrap(),
            at(15, 14)
        );
        assert!(parse_datetime_param("15/05/2025").is_err());
    }

    #[test]
    fn datetime_param_stops_at_microseconds() {
        let micros = parse_datetime_param("2025-05-15T14:00:00.000001").unwrap();
        assert_eq!(micros.nanosecond(), 1_000);

        let err = parse_datetime_param("2025-05-15T14:00:00.000000500").unwrap_err();
        assert!(err.to_string().contains("microsecond"));
        assert!(parse_datetime_param("2025-05-15T14:00:00.0000005+00:00").is_err());
    }
}
