// Database layer — hotspot storage plus a small key/value ingest-state table.
//
// SQLite (rusqlite, "bundled") is the default backend; the database file
// lives wherever GEIH_DB_PATH points (defaults to ./geih.db). PostgreSQL is
// available behind the `postgres` feature and is selected when DATABASE_URL
// is a postgres:// URL.

pub mod models;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use traits::Database;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

/// Open (or create) the SQLite database and run migrations.
///
/// Called by `geih init` and by any command that may be the first to touch
/// the database (ingest, pipeline).
pub fn initialize_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {db_path}"))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {db_path}"))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;

    schema::create_tables(&conn)?;

    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// Open an existing SQLite database (fails if it doesn't exist yet).
pub fn open_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    if !Path::new(db_path).exists() {
        anyhow::bail!("Database not found at {db_path}. Run `geih init` first.");
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {db_path}"))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;

    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// Fresh in-memory SQLite database with the schema applied.
pub fn open_sqlite_in_memory() -> Result<Arc<dyn Database>> {
    let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
    schema::create_tables(&conn)?;
    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// Connect to PostgreSQL and run migrations.
#[cfg(feature = "postgres")]
pub async fn connect_postgres(database_url: &str) -> Result<Arc<dyn Database>> {
    let db = postgres::PgDatabase::connect(database_url).await?;
    Ok(Arc::new(db))
}
