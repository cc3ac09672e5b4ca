use serde::Deserialize;

use foodmap_common::types::{Confidence, GeocodeStatus};

use crate::cache::CacheEntry;

/// Jurisdiction bias applied to every request and folded into the cache key.
#[derive(Debug, Clone)]
pub struct GeocodeBias {
    /// Administrative-area component filter (e.g. "MA").
    pub admin_area: String,
    /// Country component filter (e.g. "US").
    pub country: String,
    /// Region hint passed to the provider (e.g. "us").
    pub region: String,
    /// Viewport bias "lat,lng|lat,lng"; a bias, not a strict restriction.
    pub bounds: String,
}

impl GeocodeBias {
    /// Greater Boston viewport with Massachusetts/US component filters.
    pub fn boston() -> Self {
        Self {
            admin_area: "MA".to_string(),
            country: "US".to_string(),
            region: "us".to_string(),
            bounds: "42.20,-71.30|42.45,-70.95".to_string(),
        }
    }

    pub fn components(&self) -> String {
        format!(
            "administrative_area:{}|country:{}",
            self.admin_area, self.country
        )
    }
}

impl Default for GeocodeBias {
    fn default() -> Self {
        Self::boston()
    }
}

/// Outcome of one geocode request, cache hit or network. The caller applies
/// this to its record; the client never mutates caller state.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub status: GeocodeStatus,
    pub place_id: Option<String>,
    pub formatted_address: Option<String>,
    pub location_type: Option<String>,
    pub partial_match: Option<bool>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub confidence: Option<Confidence>,
    pub from_cache: bool,
    pub query_hash: String,
}

impl GeocodeResult {
    pub(crate) fn failure(status: GeocodeStatus, query_hash: String) -> Self {
        Self {
            status,
            place_id: None,
            formatted_address: None,
            location_type: None,
            partial_match: None,
            lat: None,
            lng: None,
            confidence: None,
            from_cache: false,
            query_hash,
        }
    }

    pub(crate) fn from_cache_entry(entry: CacheEntry, query_hash: String) -> Self {
        let confidence =
            Confidence::from_geocode(entry.location_type.as_deref(), entry.partial_match);
        Self {
            status: GeocodeStatus::Ok,
            place_id: entry.place_id,
            formatted_address: entry.formatted_address,
            location_type: entry.location_type,
            partial_match: entry.partial_match,
            lat: entry.lat,
            lng: entry.lng,
            confidence,
            from_cache: true,
            query_hash,
        }
    }

    /// Classify a provider payload: status "OK" with at least one result
    /// yields parsed fields; anything else is a no-result outcome carrying
    /// the provider's status string.
    pub(crate) fn from_provider(
        status: &str,
        first: Option<ProviderResult>,
        query_hash: String,
    ) -> Self {
        let parsed_status = GeocodeStatus::from(status);
        let Some(result) = first.filter(|_| parsed_status.is_ok()) else {
            return Self::failure(parsed_status, query_hash);
        };

        let location_type = result.geometry.location_type;
        let confidence =
            Confidence::from_geocode(location_type.as_deref(), result.partial_match);
        let (lat, lng) = match result.geometry.location {
            Some(loc) => (Some(loc.lat), Some(loc.lng)),
            None => (None, None),
        };

        Self {
            status: parsed_status,
            place_id: result.place_id,
            formatted_address: result.formatted_address,
            location_type,
            partial_match: result.partial_match,
            lat,
            lng,
            confidence,
            from_cache: false,
            query_hash,
        }
    }
}

// --- Provider wire types ---

#[derive(Debug, Deserialize)]
pub struct ProviderResponse {
    #[serde(default = "unknown_status")]
    pub status: String,
    #[serde(default)]
    pub results: Vec<ProviderResult>,
}

fn unknown_status() -> String {
    "UNKNOWN".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ProviderResult {
    pub place_id: Option<String>,
    pub formatted_address: Option<String>,
    pub partial_match: Option<bool>,
    #[serde(default)]
    pub geometry: ProviderGeometry,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProviderGeometry {
    pub location: Option<ProviderLatLng>,
    pub location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderLatLng {
    pub lat: f64,
    pub lng: f64,
}
