//! PlaceStore: the canonical `places` table, one row per real-world place.
//!
//! Idempotency lives here: the unique dedupe key plus upsert semantics make
//! re-running an ingest a no-op apart from refreshed mutable fields. The
//! store owns timestamps; `created_at` is written once on first insert.

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use foodmap_common::types::{PlaceRecord, UpsertOutcome};

#[derive(Clone)]
pub struct PlaceStore {
    pool: PgPool,
}

impl PlaceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Idempotent schema setup, run at startup.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS places (
                id BIGSERIAL PRIMARY KEY,
                dedupe_key TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                datatype TEXT NOT NULL,
                place_type TEXT NOT NULL,
                subtype TEXT NOT NULL,
                description TEXT,
                address JSONB NOT NULL,
                lng DOUBLE PRECISION,
                lat DOUBLE PRECISION,
                geocoding JSONB NOT NULL,
                contact JSONB NOT NULL,
                neighborhood_id INTEGER,
                neighborhood_name TEXT,
                sources JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_places_taxonomy ON places (datatype, subtype)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_places_lng_lat ON places (lng, lat)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS geocode_cache (
                query_hash TEXT PRIMARY KEY,
                query TEXT NOT NULL,
                place_id TEXT,
                lat DOUBLE PRECISION,
                lng DOUBLE PRECISION,
                formatted_address TEXT,
                location_type TEXT,
                partial_match BOOLEAN,
                cached_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("place store migrations applied");
        Ok(())
    }

    /// Insert-or-update by dedupe key. All mutable fields are refreshed on
    /// conflict; `created_at` is preserved from the original insert.
    pub async fn upsert_place(&self, record: &PlaceRecord) -> Result<UpsertOutcome> {
        let (lng, lat) = match record.lng_lat() {
            Some((lng, lat)) => (Some(lng), Some(lat)),
            None => (None, None),
        };

        // xmax = 0 only for freshly inserted rows
        let row = sqlx::query_as::<_, (bool,)>(
            r#"
            INSERT INTO places (
                dedupe_key, name, datatype, place_type, subtype, description,
                address, lng, lat, geocoding, contact,
                neighborhood_id, neighborhood_name, sources
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (dedupe_key) DO UPDATE SET
                name = EXCLUDED.name,
                datatype = EXCLUDED.datatype,
                place_type = EXCLUDED.place_type,
                subtype = EXCLUDED.subtype,
                description = EXCLUDED.description,
                address = EXCLUDED.address,
                lng = EXCLUDED.lng,
                lat = EXCLUDED.lat,
                geocoding = EXCLUDED.geocoding,
                contact = EXCLUDED.contact,
                neighborhood_id = EXCLUDED.neighborhood_id,
                neighborhood_name = EXCLUDED.neighborhood_name,
                sources = EXCLUDED.sources,
                updated_at = now()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.dedupe_key)
        .bind(&record.name)
        .bind(&record.datatype)
        .bind(record.place_type.to_string())
        .bind(&record.subtype)
        .bind(&record.description)
        .bind(serde_json::to_value(&record.address)?)
        .bind(lng)
        .bind(lat)
        .bind(serde_json::to_value(&record.geocoding)?)
        .bind(serde_json::to_value(&record.contact)?)
        .bind(record.neighborhood_id)
        .bind(&record.neighborhood_name)
        .bind(serde_json::to_value(&record.sources)?)
        .fetch_one(&self.pool)
        .await?;

        Ok(if row.0 {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    pub async fn count_places(&self) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM places")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
