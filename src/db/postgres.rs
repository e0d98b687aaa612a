// PgDatabase — PostgreSQL backend implementing the Database trait.
//
// Uses sqlx PgPool for native async queries. All queries use runtime
// parameter binding (not compile-time macros) to avoid requiring
// DATABASE_URL at compile time.
//
// Key differences from SQLite:
// - TIMESTAMP / TIMESTAMPTZ instead of TEXT for timestamps
// - $1/$2 parameter syntax (handled by sqlx)

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx_core::pool::Pool;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};
use uuid::Uuid;

use super::models::Hotspot;
use super::traits::Database;
use crate::query::criteria::{QueryCriteria, SqlValue};

/// Type alias for the PostgreSQL connection pool.
pub type PgPool = Pool<Postgres>;

const HOTSPOT_COLUMNS: &str = "id, latitude, longitude, acquisition_date, confidence, source,
    brightness, frp, biome, land_use, created_at, updated_at";

const UPSERT_SQL: &str = "INSERT INTO hotspots
        (id, latitude, longitude, acquisition_date, confidence, source,
         brightness, frp, biome, land_use, created_at, updated_at)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
     ON CONFLICT(id) DO UPDATE SET
        latitude = $2,
        longitude = $3,
        acquisition_date = $4,
        confidence = $5,
        source = $6,
        brightness = $7,
        frp = $8,
        biome = $9,
        land_use = $10,
        updated_at = NOW()";

pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connect to PostgreSQL and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending migrations.
    ///
    /// Holds a session-level advisory lock on a dedicated connection so two
    /// processes starting together don't race to apply the same migration.
    /// The unlock always runs, even when a migration fails.
    async fn run_migrations(&self) -> Result<()> {
        // ASCII "GEIH" as a big-endian integer.
        const MIGRATION_LOCK_KEY: i64 = 0x4745_4948;

        let mut lock_conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection for migration advisory lock")?;

        sqlx_core::query::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to acquire migration advisory lock")?;

        let migration_result: Result<()> = async {
            sqlx_core::query::query(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .execute(&self.pool)
            .await?;

            let migrations = [(
                1,
                include_str!("../../migrations/postgres/0001_initial.sql"),
            )];

            for (version, sql) in migrations {
                let applied: bool = sqlx_core::query::query(
                    "SELECT COUNT(*) > 0 FROM schema_version WHERE version = $1",
                )
                .bind(version)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.get::<bool, _>(0))
                .unwrap_or(false);

                if !applied {
                    let mut tx = self.pool.begin().await?;
                    sqlx_core::raw_sql::raw_sql(sql).execute(&mut *tx).await?;
                    tx.commit().await?;
                }
            }

            Ok(())
        }
        .await;

        let unlock_result = sqlx_core::query::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to release migration advisory lock");

        migration_result?;
        unlock_result?;

        Ok(())
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn table_count(&self) -> Result<i64> {
        let row = sqlx_core::query::query(
            "SELECT COUNT(*)::bigint FROM information_schema.tables
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn get_ingest_state(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx_core::query::query("SELECT value FROM ingest_state WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn set_ingest_state(&self, key: &str, value: &str) -> Result<()> {
        sqlx_core::query::query(
            "INSERT INTO ingest_state (key, value, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT(key) DO UPDATE SET value = $2, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_criteria(&self, criteria: &QueryCriteria) -> Result<Vec<Hotspot>> {
        let (where_sql, values) = criteria.to_sql(|i| format!("${i}"));
        let sql = format!("SELECT {HOTSPOT_COLUMNS} FROM hotspots WHERE {where_sql}");

        let mut query = sqlx_core::query::query::<Postgres>(&sql);
        for value in values {
            query = match value {
                SqlValue::Timestamp(ts) => query.bind(ts),
                SqlValue::Int(i) => query.bind(i),
                SqlValue::Float(f) => query.bind(f),
                SqlValue::Text(s) => query.bind(s),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_hotspot).collect()
    }

    async fn save(&self, hotspot: &Hotspot) -> Result<Hotspot> {
        let id = hotspot_id(hotspot);
        bind_hotspot(sqlx_core::query::query(UPSERT_SQL), &id, hotspot)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to save hotspot {id}"))?;

        self.get_hotspot(&id)
            .await?
            .with_context(|| format!("Hotspot {id} missing immediately after save"))
    }

    async fn save_batch(&self, hotspots: &[Hotspot]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for hotspot in hotspots {
            let id = hotspot_id(hotspot);
            bind_hotspot(sqlx_core::query::query(UPSERT_SQL), &id, hotspot)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to save hotspot {id}"))?;
        }
        tx.commit().await.context("Failed to commit hotspot batch")?;
        Ok(hotspots.len())
    }

    async fn get_hotspot(&self, id: &str) -> Result<Option<Hotspot>> {
        let sql = format!("SELECT {HOTSPOT_COLUMNS} FROM hotspots WHERE id = $1");
        let row = sqlx_core::query::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_hotspot).transpose()
    }

    async fn count_hotspots(&self) -> Result<i64> {
        let row = sqlx_core::query::query("SELECT COUNT(*)::bigint FROM hotspots")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn count_by_source(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx_core::query::query(
            "SELECT source, COUNT(*)::bigint AS n FROM hotspots
             GROUP BY source ORDER BY n DESC, source",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| (r.get::<String, _>(0), r.get::<i64, _>(1)))
            .collect())
    }
}

fn hotspot_id(hotspot: &Hotspot) -> String {
    hotspot
        .id
        .clone()
        .unwrap_or_else(|| format!("HS_{}", Uuid::new_v4().simple()))
}

type PgQuery<'q> = sqlx_core::query::Query<'q, Postgres, sqlx_postgres::PgArguments>;

fn bind_hotspot<'q>(query: PgQuery<'q>, id: &str, hotspot: &Hotspot) -> PgQuery<'q> {
    query
        .bind(id.to_string())
        .bind(hotspot.latitude)
        .bind(hotspot.longitude)
        .bind(hotspot.acquisition_date)
        .bind(hotspot.confidence)
        .bind(hotspot.source.clone())
        .bind(hotspot.brightness)
        .bind(hotspot.frp)
        .bind(hotspot.biome.clone())
        .bind(hotspot.land_use.clone())
}

fn row_to_hotspot(row: &PgRow) -> Result<Hotspot> {
    Ok(Hotspot {
        id: row.try_get::<Option<String>, _>("id")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        acquisition_date: row.try_get::<NaiveDateTime, _>("acquisition_date")?,
        confidence: row.try_get("confidence")?,
        source: row.try_get("source")?,
        brightness: row.try_get("brightness")?,
        frp: row.try_get("frp")?,
        biome: row.try_get("biome")?,
        land_use: row.try_get("land_use")?,
        created_at: Some(row.try_get::<DateTime<Utc>, _>("created_at")?),
        updated_at: Some(row.try_get::<DateTime<Utc>, _>("updated_at")?),
    })
}
