//! Run counters and the end-of-run summary.

use std::collections::BTreeMap;
use std::fmt;

use foodmap_common::types::GeocodeStatus;

/// Counters for one ingest run. A rejected row counts as both rejected and
/// skipped, matching how downstream consumers read the summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub rows_read: u64,
    pub rows_inserted: u64,
    pub rows_updated: u64,
    pub rows_skipped: u64,
    pub rows_rejected: u64,
    pub rows_with_source_coords: u64,
    pub geocoded_ok: u64,
    pub geocode_failed_by_status: BTreeMap<String, u64>,
}

impl RunStats {
    pub fn record_reject(&mut self) {
        self.rows_rejected += 1;
        self.rows_skipped += 1;
    }

    pub fn record_geocode(&mut self, status: &GeocodeStatus) {
        if status.is_ok() {
            self.geocoded_ok += 1;
        } else {
            *self
                .geocode_failed_by_status
                .entry(status.to_string())
                .or_insert(0) += 1;
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows read: {}", self.rows_read)?;
        writeln!(f, "source coordinates: {}", self.rows_with_source_coords)?;
        writeln!(f, "geocoded OK: {}", self.geocoded_ok)?;
        write!(f, "geocode failed by status:")?;
        if self.geocode_failed_by_status.is_empty() {
            writeln!(f, " none")?;
        } else {
            writeln!(f)?;
            for (status, count) in &self.geocode_failed_by_status {
                writeln!(f, "  {status}: {count}")?;
            }
        }
        writeln!(f, "inserted: {}", self.rows_inserted)?;
        writeln!(f, "updated: {}", self.rows_updated)?;
        writeln!(f, "skipped: {}", self.rows_skipped)?;
        write!(f, "rejected: {}", self.rows_rejected)
    }
}
