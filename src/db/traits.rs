// Database trait — backend-agnostic async interface for hotspot storage.
//
// Implementors: SqliteDatabase (wraps rusqlite), PgDatabase (wraps sqlx).
// All methods are async so both sync (rusqlite via Mutex) and native async
// (sqlx) backends fit behind a single interface.

use anyhow::Result;
use async_trait::async_trait;

use super::models::Hotspot;
use crate::query::criteria::QueryCriteria;

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Ingest state ---

    /// Get an ingest state value by key (e.g., "last_ingest_at").
    async fn get_ingest_state(&self, key: &str) -> Result<Option<String>>;

    /// Set an ingest state value (upsert).
    async fn set_ingest_state(&self, key: &str, value: &str) -> Result<()>;

    // --- Hotspots ---

    /// All hotspots matching every present criteria field, in store order.
    async fn find_by_criteria(&self, criteria: &QueryCriteria) -> Result<Vec<Hotspot>>;

    /// Insert or replace a hotspot and return the persisted version.
    ///
    /// Assigns an id when the hotspot has none, sets `created_at` on first
    /// insert and refreshes `updated_at` on every save.
    async fn save(&self, hotspot: &Hotspot) -> Result<Hotspot>;

    /// Save many hotspots in one transaction. Returns the number written.
    async fn save_batch(&self, hotspots: &[Hotspot]) -> Result<usize>;

    /// Look up a single hotspot by id.
    async fn get_hotspot(&self, id: &str) -> Result<Option<Hotspot>>;

    /// Total number of stored hotspots.
    async fn count_hotspots(&self) -> Result<i64>;

    /// Stored hotspot counts per source label, largest first.
    async fn count_by_source(&self) -> Result<Vec<(String, i64)>>;
}
