// Database queries — CRUD operations for all tables.
//
// Every SQLite interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::{ToSqlOutput, Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use tracing::debug;
use uuid::Uuid;

use super::models::{format_timestamp, Hotspot};
use crate::query::criteria::{QueryCriteria, SqlValue};

const HOTSPOT_COLUMNS: &str = "id, latitude, longitude, acquisition_date, confidence, source,
    brightness, frp, biome, land_use, created_at, updated_at";

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlValue::Timestamp(ts) => Value::Text(format_timestamp(ts)),
            SqlValue::Int(i) => Value::Integer(i64::from(*i)),
            SqlValue::Float(f) => Value::Real(*f),
            SqlValue::Text(s) => Value::Text(s.clone()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

// --- Ingest state ---

/// Get an ingest state value by key (e.g., "last_ingest_at").
pub fn get_ingest_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM ingest_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set an ingest state value (upsert).
pub fn set_ingest_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO ingest_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Hotspots ---

/// Find hotspots matching every present criteria field.
pub fn find_by_criteria(conn: &Connection, criteria: &QueryCriteria) -> Result<Vec<Hotspot>> {
    let (where_sql, values) = criteria.to_sql(|i| format!("?{i}"));
    let sql = format!("SELECT {HOTSPOT_COLUMNS} FROM hotspots WHERE {where_sql}");
    debug!(sql = %sql, bound = values.len(), "SQLite hotspot query");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), row_to_hotspot)?;

    let mut hotspots = Vec::new();
    for row in rows {
        hotspots.push(row?);
    }
    Ok(hotspots)
}

/// Look up a single hotspot by id.
pub fn get_hotspot(conn: &Connection, id: &str) -> Result<Option<Hotspot>> {
    let sql = format!("SELECT {HOTSPOT_COLUMNS} FROM hotspots WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row(params![id], row_to_hotspot).optional()?;
    Ok(result)
}

/// Insert or replace a hotspot, returning the persisted row.
pub fn save_hotspot(conn: &Connection, hotspot: &Hotspot) -> Result<Hotspot> {
    let id = upsert_hotspot(conn, hotspot, &Utc::now().naive_utc())?;
    get_hotspot(conn, &id)?
        .with_context(|| format!("Hotspot {id} missing immediately after save"))
}

/// Save a batch of hotspots in a single transaction.
pub fn save_hotspots(conn: &Connection, hotspots: &[Hotspot]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let now = Utc::now().naive_utc();
    for hotspot in hotspots {
        upsert_hotspot(&tx, hotspot, &now)?;
    }
    tx.commit().context("Failed to commit hotspot batch")?;
    Ok(hotspots.len())
}

/// Total number of stored hotspots.
pub fn count_hotspots(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM hotspots", [], |row| row.get(0))?;
    Ok(count)
}

/// Hotspot counts per source, largest first.
pub fn count_by_source(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT source, COUNT(*) AS n FROM hotspots GROUP BY source ORDER BY n DESC, source",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

// --- Helpers ---

/// Write one hotspot, keeping `created_at` when the id already exists.
/// Returns the id the row was stored under.
fn upsert_hotspot(conn: &Connection, hotspot: &Hotspot, now: &NaiveDateTime) -> Result<String> {
    let id = hotspot
        .id
        .clone()
        .unwrap_or_else(|| format!("HS_{}", Uuid::new_v4().simple()));
    let now = format_timestamp(now);

    conn.execute(
        "INSERT INTO hotspots (id, latitude, longitude, acquisition_date, confidence, source,
                               brightness, frp, biome, land_use, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
         ON CONFLICT(id) DO UPDATE SET
            latitude = ?2,
            longitude = ?3,
            acquisition_date = ?4,
            confidence = ?5,
            source = ?6,
            brightness = ?7,
            frp = ?8,
            biome = ?9,
            land_use = ?10,
            updated_at = ?11",
        params![
            id,
            hotspot.latitude,
            hotspot.longitude,
            format_timestamp(&hotspot.acquisition_date),
            hotspot.confidence,
            hotspot.source,
            hotspot.brightness,
            hotspot.frp,
            hotspot.biome,
            hotspot.land_use,
            now,
        ],
    )
    .with_context(|| format!("Failed to save hotspot {id}"))?;

    Ok(id)
}

fn row_to_hotspot(row: &Row<'_>) -> rusqlite::Result<Hotspot> {
    Ok(Hotspot {
        id: row.get(0)?,
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        acquisition_date: timestamp_column(row, 3)?,
        confidence: row.get(4)?,
        source: row.get(5)?,
        brightness: row.get(6)?,
        frp: row.get(7)?,
        biome: row.get(8)?,
        land_use: row.get(9)?,
        created_at: Some(timestamp_column(row, 10)?.and_utc()),
        updated_at: Some(timestamp_column(row, 11)?.and_utc()),
    })
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;
    use crate::query::criteria::BoundingBox;
    use chrono::NaiveDate;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn save_assigns_id_and_timestamps() {
        let conn = conn();
        let saved = save_hotspot(&conn, &Hotspot::new(-9.0, -56.0, at(1), 70, "VIIRS")).unwrap();
        assert!(saved.id.as_deref().unwrap().starts_with("HS_"));
        assert!(saved.created_at.is_some());
        assert_eq!(saved.created_at, saved.updated_at);
    }

    #[test]
    fn resave_keeps_created_at_and_replaces_fields() {
        let conn = conn();
        let first = save_hotspot(
            &conn,
            &Hotspot::new(-9.0, -56.0, at(1), 70, "VIIRS").with_id("FIRMS_a"),
        )
        .unwrap();
        let mut changed = first.clone();
        changed.confidence = 95;
        let second = save_hotspot(&conn, &changed).unwrap();

        assert_eq!(second.confidence, 95);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(count_hotspots(&conn).unwrap(), 1);
    }

    #[test]
    fn find_with_bbox_and_confidence() {
        let conn = conn();
        save_hotspots(
            &conn,
            &[
                Hotspot::new(-9.0, -56.0, at(1), 85, "VIIRS").with_id("in"),
                Hotspot::new(-9.0, -56.0, at(1), 40, "VIIRS").with_id("low"),
                Hotspot::new(12.0, -56.0, at(1), 90, "VIIRS").with_id("north"),
            ],
        )
        .unwrap();

        let criteria = QueryCriteria {
            min_confidence: Some(80),
            bounding_box: Some(BoundingBox::new(-60.0, -10.0, -50.0, 0.0)),
            ..Default::default()
        };
        let found = find_by_criteria(&conn, &criteria).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_deref(), Some("in"));
    }

    #[test]
    fn ingest_state_roundtrip() {
        let conn = conn();
        assert_eq!(get_ingest_state(&conn, "last_ingest_at").unwrap(), None);
        set_ingest_state(&conn, "last_ingest_at", "2025-05-01").unwrap();
        set_ingest_state(&conn, "last_ingest_at", "2025-05-02").unwrap();
        assert_eq!(
            get_ingest_state(&conn, "last_ingest_at").unwrap(),
            Some("2025-05-02".to_string())
        );
    }

    #[test]
    fn counts_by_source() {
        let conn = conn();
        save_hotspots(
            &conn,
            &[
                Hotspot::new(0.0, 0.0, at(1), 50, "VIIRS"),
                Hotspot::new(0.0, 0.0, at(2), 50, "VIIRS"),
                Hotspot::new(0.0, 0.0, at(3), 50, "MODIS"),
            ],
        )
        .unwrap();
        assert_eq!(
            count_by_source(&conn).unwrap(),
            vec![("VIIRS".to_string(), 2), ("MODIS".to_string(), 1)]
        );
    }
}
