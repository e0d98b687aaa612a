// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::Hotspot;
use super::traits::Database;
use crate::query::criteria::QueryCriteria;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn get_ingest_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_ingest_state(&conn, key)
    }

    async fn set_ingest_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_ingest_state(&conn, key, value)
    }

    async fn find_by_criteria(&self, criteria: &QueryCriteria) -> Result<Vec<Hotspot>> {
        let conn = self.conn.lock().await;
        super::queries::find_by_criteria(&conn, criteria)
    }

    async fn save(&self, hotspot: &Hotspot) -> Result<Hotspot> {
        let conn = self.conn.lock().await;
        super::queries::save_hotspot(&conn, hotspot)
    }

    async fn save_batch(&self, hotspots: &[Hotspot]) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::save_hotspots(&conn, hotspots)
    }

    async fn get_hotspot(&self, id: &str) -> Result<Option<Hotspot>> {
        let conn = self.conn.lock().await;
        super::queries::get_hotspot(&conn, id)
    }

    async fn count_hotspots(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::count_hotspots(&conn)
    }

    async fn count_by_source(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().await;
        super::queries::count_by_source(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;
    use chrono::NaiveDate;

    async fn test_db() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteDatabase::new(conn)
    }

    fn sample() -> Hotspot {
        let acquired = NaiveDate::from_ymd_opt(2025, 5, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        Hotspot::new(-9.45678, -56.78901, acquired, 85, "VIIRS")
            .with_id("FIRMS_12345678")
            .with_brightness(325.7)
            .with_frp(45.2)
            .with_biome("Amazon Rainforest")
            .with_land_use("Forest")
    }

    #[tokio::test]
    async fn test_trait_ingest_state_roundtrip() {
        let db = test_db().await;
        assert_eq!(db.get_ingest_state("last_ingest_at").await.unwrap(), None);
        db.set_ingest_state("last_ingest_at", "2025-05-15T15:00:00Z")
            .await
            .unwrap();
        assert_eq!(
            db.get_ingest_state("last_ingest_at").await.unwrap(),
            Some("2025-05-15T15:00:00Z".to_string())
        );
    }

    #[tokio::test]
    async fn test_trait_save_then_get() {
        let db = test_db().await;
        let saved = db.save(&sample()).await.unwrap();
        let loaded = db.get_hotspot("FIRMS_12345678").await.unwrap().unwrap();
        assert_eq!(saved, loaded);
        assert!(loaded.same_detection(&sample()));
    }

    #[tokio::test]
    async fn test_trait_save_batch_and_count() {
        let db = test_db().await;
        let mut second = sample();
        second.id = Some("FIRMS_87654321".to_string());
        second.source = "MODIS".to_string();
        let written = db.save_batch(&[sample(), second]).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(db.count_hotspots().await.unwrap(), 2);
        assert_eq!(db.count_by_source().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_trait_find_empty_store() {
        let db = test_db().await;
        let found = db.find_by_criteria(&QueryCriteria::default()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_trait_table_count() {
        let db = test_db().await;
        assert_eq!(db.table_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_trait_get_missing_hotspot() {
        let db = test_db().await;
        assert!(db.get_hotspot("nope").await.unwrap().is_none());
    }
}
