//! Postgres-backed geocode cache shared across ingest runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use geocode_client::cache::{CacheEntry, GeocodeCache};

#[derive(Clone)]
pub struct PgGeocodeCache {
    pool: PgPool,
}

impl PgGeocodeCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type CacheRow = (
    String,
    String,
    Option<String>,
    Option<f64>,
    Option<f64>,
    Option<String>,
    Option<String>,
    Option<bool>,
    DateTime<Utc>,
);

#[async_trait]
impl GeocodeCache for PgGeocodeCache {
    async fn get(&self, query_hash: &str) -> anyhow::Result<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, CacheRow>(
            r#"
            SELECT query_hash, query, place_id, lat, lng,
                   formatted_address, location_type, partial_match, cached_at
            FROM geocode_cache
            WHERE query_hash = $1
            "#,
        )
        .bind(query_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(query_hash, query, place_id, lat, lng, formatted_address, location_type, partial_match, cached_at)| {
                CacheEntry {
                    query_hash,
                    query,
                    place_id,
                    lat,
                    lng,
                    formatted_address,
                    location_type,
                    partial_match,
                    cached_at,
                }
            },
        ))
    }

    async fn put(&self, entry: &CacheEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO geocode_cache (
                query_hash, query, place_id, lat, lng,
                formatted_address, location_type, partial_match, cached_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (query_hash) DO UPDATE SET
                query = EXCLUDED.query,
                place_id = EXCLUDED.place_id,
                lat = EXCLUDED.lat,
                lng = EXCLUDED.lng,
                formatted_address = EXCLUDED.formatted_address,
                location_type = EXCLUDED.location_type,
                partial_match = EXCLUDED.partial_match,
                cached_at = EXCLUDED.cached_at
            "#,
        )
        .bind(&entry.query_hash)
        .bind(&entry.query)
        .bind(&entry.place_id)
        .bind(entry.lat)
        .bind(entry.lng)
        .bind(&entry.formatted_address)
        .bind(&entry.location_type)
        .bind(entry.partial_match)
        .bind(entry.cached_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
