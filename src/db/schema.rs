// Database schema — table creation.
//
// A `schema_version` table tracks which schema revisions have been applied
// so later changes can be layered on as numbered migrations.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Satellite fire detections
        -- Timestamps are fixed-width ISO text so range comparisons are lexical
        CREATE TABLE IF NOT EXISTS hotspots (
            id TEXT PRIMARY KEY,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            acquisition_date TEXT NOT NULL,
            confidence INTEGER NOT NULL,
            source TEXT NOT NULL,              -- MODIS / VIIRS / ...
            brightness REAL,                   -- Kelvin
            frp REAL,                          -- fire radiative power, MW
            biome TEXT,
            land_use TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Ingest state — last run timestamps and counts
        CREATE TABLE IF NOT EXISTS ingest_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Date-range queries are the common case
        CREATE INDEX IF NOT EXISTS idx_hotspots_acquisition
            ON hotspots(acquisition_date);

        CREATE INDEX IF NOT EXISTS idx_hotspots_source
            ON hotspots(source);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![1]);
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // schema_version, hotspots, ingest_state
        assert_eq!(table_count(&conn).unwrap(), 3i64);
    }

    #[test]
    fn test_required_columns_reject_null() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO hotspots (id, latitude, longitude, acquisition_date, confidence, source, created_at, updated_at)
             VALUES ('x', 1.0, 2.0, '2025-05-01T00:00:00.000000', 50, NULL, '', '')",
            [],
        );
        assert!(result.is_err());
    }
}
