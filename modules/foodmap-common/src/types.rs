use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// --- Place taxonomy ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceType {
    FarmersMarket,
    GroceryStore,
    FoodPantry,
    Restaurant,
}

impl fmt::Display for PlaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceType::FarmersMarket => write!(f, "farmers_market"),
            PlaceType::GroceryStore => write!(f, "grocery_store"),
            PlaceType::FoodPantry => write!(f, "food_pantry"),
            PlaceType::Restaurant => write!(f, "restaurant"),
        }
    }
}

// --- Geocoding metadata ---

/// Where a record stands with respect to geocoding. Serialized as the
/// provider-style string literal ("OK", "HTTP_503", ...) so the persisted
/// document matches the wire contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeStatus {
    /// Source has no native coordinates and the geocoder was not invoked.
    NotRequested,
    /// Coordinates came with the source row; no geocoding needed.
    SourceCoordinates,
    /// Source normally carries coordinates but this row lacked them.
    MissingSourceCoordinates,
    /// Geocoding intentionally disabled for the run.
    SkippedNoGeocode,
    /// Provider returned a usable result.
    Ok,
    /// Terminal HTTP error from the provider endpoint.
    Http(u16),
    /// Transport failures exhausted all retries.
    RequestFailed,
    /// Provider returned a body that did not parse as a geocode response.
    MalformedResponse,
    /// Provider over-quota status survived all retries.
    OverQueryLimit,
    /// Any other provider status string (ZERO_RESULTS, REQUEST_DENIED, ...).
    Provider(String),
}

impl GeocodeStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, GeocodeStatus::Ok)
    }
}

impl fmt::Display for GeocodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocodeStatus::NotRequested => write!(f, "NOT_REQUESTED"),
            GeocodeStatus::SourceCoordinates => write!(f, "SOURCE_COORDINATES"),
            GeocodeStatus::MissingSourceCoordinates => write!(f, "MISSING_SOURCE_COORDINATES"),
            GeocodeStatus::SkippedNoGeocode => write!(f, "SKIPPED_NO_GEOCODE"),
            GeocodeStatus::Ok => write!(f, "OK"),
            GeocodeStatus::Http(code) => write!(f, "HTTP_{code}"),
            GeocodeStatus::RequestFailed => write!(f, "REQUEST_FAILED"),
            GeocodeStatus::MalformedResponse => write!(f, "MALFORMED_RESPONSE"),
            GeocodeStatus::OverQueryLimit => write!(f, "OVER_QUERY_LIMIT"),
            GeocodeStatus::Provider(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for GeocodeStatus {
    fn from(s: &str) -> Self {
        match s {
            "NOT_REQUESTED" => GeocodeStatus::NotRequested,
            "SOURCE_COORDINATES" => GeocodeStatus::SourceCoordinates,
            "MISSING_SOURCE_COORDINATES" => GeocodeStatus::MissingSourceCoordinates,
            "SKIPPED_NO_GEOCODE" => GeocodeStatus::SkippedNoGeocode,
            "OK" => GeocodeStatus::Ok,
            "REQUEST_FAILED" => GeocodeStatus::RequestFailed,
            "MALFORMED_RESPONSE" => GeocodeStatus::MalformedResponse,
            "OVER_QUERY_LIMIT" => GeocodeStatus::OverQueryLimit,
            other => match other.strip_prefix("HTTP_").and_then(|c| c.parse().ok()) {
                Some(code) => GeocodeStatus::Http(code),
                None => GeocodeStatus::Provider(other.to_string()),
            },
        }
    }
}

impl FromStr for GeocodeStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(GeocodeStatus::from(s))
    }
}

impl Serialize for GeocodeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for GeocodeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(GeocodeStatus::from(s.as_str()))
    }
}

/// Qualitative trust in a geocode result, derived from response metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// ROOFTOP precision with a full match is high; interpolated or
    /// centroid placements are medium; anything else (including any
    /// partial match) is low. No location type means no opinion.
    pub fn from_geocode(location_type: Option<&str>, partial_match: Option<bool>) -> Option<Self> {
        let location_type = location_type?;
        let partial = partial_match.unwrap_or(false);
        if location_type == "ROOFTOP" && !partial {
            return Some(Confidence::High);
        }
        if matches!(location_type, "RANGE_INTERPOLATED" | "GEOMETRIC_CENTER") && !partial {
            return Some(Confidence::Medium);
        }
        Some(Confidence::Low)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

// --- Record geometry ---

/// GeoJSON point, longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub geometry_type: PointType,
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointType {
    Point,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            geometry_type: PointType::Point,
            coordinates: [lng, lat],
        }
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

// --- Canonical record ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub city_raw: Option<String>,
    pub city_norm: Option<String>,
    pub state: String,
    pub zip: Option<String>,
    pub formatted_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geocoding {
    pub provider: String,
    pub status: GeocodeStatus,
    pub place_id: Option<String>,
    pub location_type: Option<String>,
    pub partial_match: Option<bool>,
    pub confidence: Option<Confidence>,
}

impl Geocoding {
    /// Pending geocode through the external provider.
    pub fn not_requested() -> Self {
        Self {
            provider: "google".to_string(),
            status: GeocodeStatus::NotRequested,
            place_id: None,
            location_type: None,
            partial_match: None,
            confidence: None,
        }
    }

    /// Coordinates supplied by the source file itself.
    pub fn source_coordinates() -> Self {
        Self {
            provider: "source_csv".to_string(),
            status: GeocodeStatus::SourceCoordinates,
            place_id: None,
            location_type: None,
            partial_match: None,
            confidence: Some(Confidence::High),
        }
    }

    /// Source usually carries coordinates but this row did not.
    pub fn missing_source_coordinates() -> Self {
        Self {
            provider: "source_csv".to_string(),
            status: GeocodeStatus::MissingSourceCoordinates,
            place_id: None,
            location_type: None,
            partial_match: None,
            confidence: None,
        }
    }

    /// Geocoding disabled for the run.
    pub fn skipped() -> Self {
        Self {
            provider: "google".to_string(),
            status: GeocodeStatus::SkippedNoGeocode,
            place_id: None,
            location_type: None,
            partial_match: None,
            confidence: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contact {
    pub website: Option<String>,
    pub phone: Option<String>,
}

/// Provenance of one raw row. Every record carries exactly one entry per
/// ingested row; the raw payload is kept opaque for auditing and replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub source_name: String,
    pub source_file: String,
    pub source_row_hash: String,
    pub needs_geocoding: bool,
    pub raw: serde_json::Value,
}

/// The normalized, schema-stable document persisted per real-world entity.
/// Structurally identical across all source pipelines so downstream queries
/// stay source-agnostic. Timestamps are owned by the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub dedupe_key: String,
    pub name: String,
    pub datatype: String,
    pub place_type: PlaceType,
    pub subtype: String,
    pub description: Option<String>,
    pub address: Address,
    pub location: Option<GeoPoint>,
    pub geocoding: Geocoding,
    pub contact: Contact,
    pub neighborhood_id: Option<i32>,
    pub neighborhood_name: Option<String>,
    pub sources: Vec<SourceEntry>,
}

impl PlaceRecord {
    /// Longitude/latitude of the record, if geocoded or natively located.
    pub fn lng_lat(&self) -> Option<(f64, f64)> {
        self.location.map(|p| (p.lng(), p.lat()))
    }
}

// --- Rejects ---

/// A row that could not be processed. Rejects never block the batch; they
/// are appended to a run-scoped log written even when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reject {
    pub csv_line_number: u64,
    pub reason: String,
    pub raw: serde_json::Value,
}

// --- Persistence ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// What the sink persists for geocoded rows. `StorePlaceIdOnly` suppresses
/// coordinate storage and keeps only the provider place identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    StoreCoords,
    StorePlaceIdOnly,
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreMode::StoreCoords => write!(f, "store_coords"),
            StoreMode::StorePlaceIdOnly => write!(f, "store_place_id_only"),
        }
    }
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "store_coords" => Ok(StoreMode::StoreCoords),
            "store_place_id_only" => Ok(StoreMode::StorePlaceIdOnly),
            other => Err(format!(
                "invalid store mode {other:?}; expected store_coords or store_place_id_only"
            )),
        }
    }
}
