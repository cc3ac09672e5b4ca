//! CSV ingest for the food-access map: source descriptors, row
//! normalization, geocode enrichment, neighborhood assignment, and the
//! upsert pipeline behind the `foodmap-ingest` binary.

pub mod normalizer;
pub mod pipeline;
pub mod reader;
pub mod rejects;
pub mod sources;
pub mod stats;

pub use pipeline::{MemorySink, Pipeline, PipelineRun, PlaceSink};
pub use sources::SourceKind;
pub use stats::RunStats;
