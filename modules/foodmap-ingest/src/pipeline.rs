//! Per-row orchestration: normalize, geocode or skip, assign neighborhood,
//! persist. Row-local failures become rejects; nothing here aborts a batch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use foodmap_common::types::{
    GeoPoint, Geocoding, PlaceRecord, Reject, StoreMode, UpsertOutcome,
};
use foodmap_geo::NeighborhoodIndex;
use foodmap_store::PlaceStore;
use geocode_client::{GeocodeClient, GeocodeResult};

use crate::normalizer::normalize_row;
use crate::reader::RawRow;
use crate::sources::SourceKind;
use crate::stats::RunStats;

/// Where finished records land. The pipeline only ever upserts.
#[async_trait]
pub trait PlaceSink: Send + Sync {
    async fn upsert(&self, record: &PlaceRecord) -> anyhow::Result<UpsertOutcome>;
}

#[async_trait]
impl PlaceSink for PlaceStore {
    async fn upsert(&self, record: &PlaceRecord) -> anyhow::Result<UpsertOutcome> {
        self.upsert_place(record).await
    }
}

/// HashMap-backed sink for tests and offline runs.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<HashMap<String, PlaceRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, dedupe_key: &str) -> Option<PlaceRecord> {
        self.records.lock().unwrap().get(dedupe_key).cloned()
    }
}

#[async_trait]
impl PlaceSink for MemorySink {
    async fn upsert(&self, record: &PlaceRecord) -> anyhow::Result<UpsertOutcome> {
        let mut records = self.records.lock().unwrap();
        let outcome = if records.contains_key(&record.dedupe_key) {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };
        records.insert(record.dedupe_key.clone(), record.clone());
        Ok(outcome)
    }
}

/// The geocoder's free-text query for a record. City falls back through the
/// normalized and raw forms to "Boston".
pub fn build_geocode_query(record: &PlaceRecord) -> String {
    let city = record
        .address
        .city_norm
        .as_deref()
        .or(record.address.city_raw.as_deref())
        .unwrap_or("Boston");
    let line1 = &record.address.line1;
    match record.address.zip.as_deref() {
        Some(zip) => format!("{line1}, {city}, MA {zip}, USA"),
        None => format!("{line1}, {city}, MA, USA"),
    }
}

/// Fold a geocode result into the record. Status and metadata are always
/// applied; coordinates are stored only on success under `store_coords`.
pub fn apply_geocode(record: &mut PlaceRecord, result: &GeocodeResult, store_mode: StoreMode) {
    record.geocoding = Geocoding {
        provider: "google".to_string(),
        status: result.status.clone(),
        place_id: result.place_id.clone(),
        location_type: result.location_type.clone(),
        partial_match: result.partial_match,
        confidence: result.confidence,
    };
    record.address.formatted_address = result.formatted_address.clone();

    record.location = if result.status.is_ok() && store_mode == StoreMode::StoreCoords {
        match (result.lng, result.lat) {
            (Some(lng), Some(lat)) => Some(GeoPoint::new(lng, lat)),
            _ => None,
        }
    } else {
        None
    };

    record.sources[0].needs_geocoding = !result.status.is_ok();
}

pub struct Pipeline {
    kind: SourceKind,
    /// None when geocoding is disabled for the run.
    geocoder: Option<GeocodeClient>,
    index: NeighborhoodIndex,
    /// None in dry runs; rows are normalized and enriched but not persisted.
    sink: Option<Arc<dyn PlaceSink>>,
    store_mode: StoreMode,
}

/// Everything a run produces besides side effects: counters, the reject
/// list, and (dry runs only) the first normalized record as a sample.
pub struct PipelineRun {
    pub stats: RunStats,
    pub rejects: Vec<Reject>,
    pub sample: Option<Value>,
}

impl Pipeline {
    pub fn new(
        kind: SourceKind,
        geocoder: Option<GeocodeClient>,
        index: NeighborhoodIndex,
        sink: Option<Arc<dyn PlaceSink>>,
        store_mode: StoreMode,
    ) -> Self {
        Self {
            kind,
            geocoder,
            index,
            sink,
            store_mode,
        }
    }

    pub async fn run(&self, rows: &[RawRow]) -> PipelineRun {
        let mut stats = RunStats::default();
        let mut rejects: Vec<Reject> = Vec::new();
        let mut sample: Option<Value> = None;

        for row in rows {
            stats.rows_read += 1;

            let mut record = match normalize_row(self.kind, row) {
                Ok(record) => record,
                Err(error) => {
                    stats.record_reject();
                    rejects.push(Reject {
                        csv_line_number: row.line_number,
                        reason: error.to_string(),
                        raw: row.to_json(),
                    });
                    continue;
                }
            };

            if record.location.is_some() {
                // native source coordinates, no geocode needed
                stats.rows_with_source_coords += 1;
            } else if let Some(geocoder) = &self.geocoder {
                let query = build_geocode_query(&record);
                let result = geocoder.geocode(&query).await;
                stats.record_geocode(&result.status);
                apply_geocode(&mut record, &result, self.store_mode);
            } else {
                record.geocoding = Geocoding::skipped();
                record.location = None;
                record.sources[0].needs_geocoding = true;
            }

            self.index.assign(&mut record);

            let Some(sink) = &self.sink else {
                if sample.is_none() {
                    sample = serde_json::to_value(&record).ok();
                }
                continue;
            };

            match sink.upsert(&record).await {
                Ok(UpsertOutcome::Inserted) => stats.rows_inserted += 1,
                Ok(UpsertOutcome::Updated) => stats.rows_updated += 1,
                Err(error) => {
                    warn!(%error, dedupe_key = %record.dedupe_key, "upsert failed");
                    stats.record_reject();
                    rejects.push(Reject {
                        csv_line_number: row.line_number,
                        reason: format!("upsert_error: {error}"),
                        raw: record.sources[0].raw.clone(),
                    });
                }
            }
        }

        info!(
            rows_read = stats.rows_read,
            inserted = stats.rows_inserted,
            updated = stats.rows_updated,
            rejected = stats.rows_rejected,
            "ingest run finished"
        );

        PipelineRun {
            stats,
            rejects,
            sample,
        }
    }
}
