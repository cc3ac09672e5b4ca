use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cached geocode lookup, keyed by the deterministic query hash.
/// Created on first successful lookup, read-only afterward; stale entries
/// are acceptable since addresses rarely move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query_hash: String,
    pub query: String,
    pub place_id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub formatted_address: Option<String>,
    pub location_type: Option<String>,
    pub partial_match: Option<bool>,
    pub cached_at: DateTime<Utc>,
}

/// Persistent lookup cache. Implemented by the Postgres store and by
/// `MemoryGeocodeCache` for tests and dry runs.
#[async_trait]
pub trait GeocodeCache: Send + Sync {
    async fn get(&self, query_hash: &str) -> anyhow::Result<Option<CacheEntry>>;

    /// Upsert semantics: re-writing the same query hash is idempotent.
    async fn put(&self, entry: &CacheEntry) -> anyhow::Result<()>;
}

/// HashMap-backed cache.
#[derive(Default)]
pub struct MemoryGeocodeCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryGeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl GeocodeCache for MemoryGeocodeCache {
    async fn get(&self, query_hash: &str) -> anyhow::Result<Option<CacheEntry>> {
        Ok(self.entries.lock().unwrap().get(query_hash).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(entry.query_hash.clone(), entry.clone());
        Ok(())
    }
}
