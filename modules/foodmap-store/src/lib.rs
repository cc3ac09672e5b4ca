//! Postgres persistence: the `places` table keyed by dedupe key, plus the
//! shared geocode lookup cache.

pub mod cache;
pub mod store;

pub use cache::PgGeocodeCache;
pub use store::PlaceStore;
