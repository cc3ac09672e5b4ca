//! Boundary index construction and record assignment.
//!
//! IDs come from the population reference dataset in first-seen order and
//! never change across runs. Boundaries join to reference entries by
//! canonicalized name; a reference entry with no boundary is a startup
//! error, not a mid-batch one.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use foodmap_common::canonical::canonical_name;
use foodmap_common::error::FoodmapError;
use foodmap_common::types::PlaceRecord;

use crate::geometry::Geometry;

#[derive(Debug, Clone)]
pub struct NeighborhoodFeature {
    pub id: i32,
    pub name: String,
    /// None when the boundary feature carried an unsupported geometry;
    /// such a feature satisfies the join but contains no points.
    pub geometry: Option<Geometry>,
}

/// Boundary index. Lookup walks features in ascending ID order and the
/// first containing boundary wins; that is the tie-break for points on
/// shared edges or inside overlapping geometries.
#[derive(Debug)]
pub struct NeighborhoodIndex {
    features: Vec<NeighborhoodFeature>,
}

impl NeighborhoodIndex {
    pub fn load(
        population_csv: &Path,
        boundaries_geojson: &Path,
    ) -> Result<Self, FoodmapError> {
        let population = File::open(population_csv).map_err(|e| {
            FoodmapError::BoundaryData(format!(
                "population CSV not found: {}: {e}",
                population_csv.display()
            ))
        })?;
        let geojson = std::fs::read_to_string(boundaries_geojson).map_err(|e| {
            FoodmapError::BoundaryData(format!(
                "boundaries GeoJSON not found: {}: {e}",
                boundaries_geojson.display()
            ))
        })?;
        let index = Self::from_readers(population, &geojson)?;
        info!(
            neighborhoods = index.len(),
            "loaded neighborhood boundaries"
        );
        Ok(index)
    }

    /// Build from in-memory data; the file-path loader delegates here.
    pub fn from_readers(population: impl Read, geojson: &str) -> Result<Self, FoodmapError> {
        let reference = load_reference_ids(population)?;
        let features = load_boundaries(geojson, &reference)?;
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// First containing boundary in ascending ID order, or None.
    pub fn find(&self, lng: f64, lat: f64) -> Option<(i32, &str)> {
        self.features
            .iter()
            .find(|f| {
                f.geometry
                    .as_ref()
                    .is_some_and(|g| g.contains(lng, lat))
            })
            .map(|f| (f.id, f.name.as_str()))
    }

    /// Label a record with its neighborhood. Records without coordinates,
    /// or outside every boundary, get explicit nulls.
    pub fn assign(&self, record: &mut PlaceRecord) {
        match record
            .lng_lat()
            .and_then(|(lng, lat)| self.find(lng, lat))
        {
            Some((id, name)) => {
                record.neighborhood_id = Some(id);
                record.neighborhood_name = Some(name.to_string());
            }
            None => {
                record.neighborhood_id = None;
                record.neighborhood_name = None;
            }
        }
    }
}

/// Reference entry: stable ID plus the canonical display name.
type ReferenceMap = HashMap<String, (i32, String)>;

/// Read the population reference CSV and assign IDs in first-seen order,
/// keyed by canonicalized name so punctuation/case variants collide.
fn load_reference_ids(reader: impl Read) -> Result<ReferenceMap, FoodmapError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| FoodmapError::BoundaryData(format!("population CSV unreadable: {e}")))?;

    let name_column = headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == "Neighborhood")
        .ok_or_else(|| {
            FoodmapError::BoundaryData(
                "population CSV must contain a 'Neighborhood' column".to_string(),
            )
        })?;

    let mut mapping = ReferenceMap::new();
    let mut next_id = 1;
    for row in csv_reader.records() {
        let row =
            row.map_err(|e| FoodmapError::BoundaryData(format!("population CSV row: {e}")))?;
        let name = row.get(name_column).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        let key = canonical_name(name);
        if mapping.contains_key(&key) {
            continue;
        }
        mapping.insert(key, (next_id, name.to_string()));
        next_id += 1;
    }

    if mapping.is_empty() {
        return Err(FoodmapError::BoundaryData(
            "no neighborhoods loaded from population CSV".to_string(),
        ));
    }
    Ok(mapping)
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Properties,
    #[serde(default)]
    geometry: serde_json::Value,
}

#[derive(Deserialize, Default)]
struct Properties {
    name: Option<String>,
}

/// Join GeoJSON boundary features to the reference entries. Features whose
/// name is absent from the reference are ignored; a reference entry with no
/// boundary fails construction, listing the missing names.
fn load_boundaries(
    geojson: &str,
    reference: &ReferenceMap,
) -> Result<Vec<NeighborhoodFeature>, FoodmapError> {
    let collection: FeatureCollection = serde_json::from_str(geojson)
        .map_err(|e| FoodmapError::BoundaryData(format!("invalid boundaries GeoJSON: {e}")))?;

    let mut resolved = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for feature in collection.features {
        let Some(name) = feature.properties.name.as_deref().map(str::trim) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let key = canonical_name(name);
        let Some((id, canonical)) = reference.get(&key) else {
            continue;
        };
        resolved.push(NeighborhoodFeature {
            id: *id,
            name: canonical.clone(),
            geometry: Geometry::from_value(&feature.geometry),
        });
        seen.insert(key);
    }

    let mut missing: Vec<&str> = reference
        .iter()
        .filter(|(key, _)| !seen.contains(*key))
        .map(|(_, (_, name))| name.as_str())
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(FoodmapError::BoundaryData(format!(
            "neighborhoods from the population reference are missing in the boundaries GeoJSON: {}",
            missing.join(", ")
        )));
    }

    resolved.sort_by_key(|f| f.id);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    use foodmap_common::types::{
        Address, Contact, GeoPoint, Geocoding, PlaceRecord, PlaceType,
    };

    const POPULATION_CSV: &str = "\
Neighborhood,Population
Roxbury,52534
Allston/Brighton,74997
Hyde Park,38924
";

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
        })
    }

    fn boundaries() -> String {
        // Roxbury and Allston Brighton share the x = 1.0 edge
        serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {"properties": {"name": "Allston Brighton"}, "geometry": square(1.0, 0.0, 2.0, 1.0)},
                {"properties": {"name": "Roxbury"}, "geometry": square(0.0, 0.0, 1.0, 1.0)},
                {"properties": {"name": "Hyde Park"}, "geometry": square(5.0, 5.0, 6.0, 6.0)},
                {"properties": {"name": "Not In Reference"}, "geometry": square(9.0, 9.0, 10.0, 10.0)}
            ]
        })
        .to_string()
    }

    fn index() -> NeighborhoodIndex {
        NeighborhoodIndex::from_readers(POPULATION_CSV.as_bytes(), &boundaries()).unwrap()
    }

    fn record_at(location: Option<GeoPoint>) -> PlaceRecord {
        PlaceRecord {
            dedupe_key: "massgrown:abc".to_string(),
            name: "Test Market".to_string(),
            datatype: "farmers market".to_string(),
            place_type: PlaceType::FarmersMarket,
            subtype: "farmers_market".to_string(),
            description: None,
            address: Address {
                line1: "10 Warren St".to_string(),
                city_raw: None,
                city_norm: None,
                state: "MA".to_string(),
                zip: None,
                formatted_address: None,
            },
            location,
            geocoding: Geocoding::not_requested(),
            contact: Contact::default(),
            neighborhood_id: None,
            neighborhood_name: None,
            sources: vec![],
        }
    }

    #[test]
    fn ids_follow_reference_order_not_geojson_order() {
        let index = index();
        assert_eq!(index.find(0.5, 0.5), Some((1, "Roxbury")));
        assert_eq!(index.find(1.5, 0.5), Some((2, "Allston/Brighton")));
        assert_eq!(index.find(5.5, 5.5), Some((3, "Hyde Park")));
    }

    #[test]
    fn no_match_outside_all_boundaries() {
        assert_eq!(index().find(-3.0, -3.0), None);
    }

    #[test]
    fn shared_edge_resolves_to_lowest_id_consistently() {
        let index = index();
        for _ in 0..10 {
            assert_eq!(index.find(1.0, 0.5), Some((1, "Roxbury")));
        }
    }

    #[test]
    fn canonical_names_join_punctuation_variants() {
        // CSV says "Allston/Brighton", GeoJSON says "Allston Brighton"
        assert_eq!(index().find(1.5, 0.5), Some((2, "Allston/Brighton")));
    }

    #[test]
    fn missing_boundary_fails_construction() {
        let geojson = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {"properties": {"name": "Roxbury"}, "geometry": square(0.0, 0.0, 1.0, 1.0)}
            ]
        })
        .to_string();
        let err = NeighborhoodIndex::from_readers(POPULATION_CSV.as_bytes(), &geojson)
            .unwrap_err()
            .to_string();
        assert!(err.contains("Allston/Brighton"));
        assert!(err.contains("Hyde Park"));
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let err = NeighborhoodIndex::from_readers("Name\nRoxbury\n".as_bytes(), &boundaries())
            .unwrap_err()
            .to_string();
        assert!(err.contains("Neighborhood"));
    }

    #[test]
    fn assign_labels_record_inside_boundary() {
        let mut record = record_at(Some(GeoPoint::new(0.5, 0.5)));
        index().assign(&mut record);
        assert_eq!(record.neighborhood_id, Some(1));
        assert_eq!(record.neighborhood_name.as_deref(), Some("Roxbury"));
    }

    #[test]
    fn assign_nulls_without_coordinates_or_match() {
        let index = index();

        let mut record = record_at(None);
        record.neighborhood_id = Some(99);
        record.neighborhood_name = Some("stale".to_string());
        index.assign(&mut record);
        assert_eq!(record.neighborhood_id, None);
        assert_eq!(record.neighborhood_name, None);

        let mut record = record_at(Some(GeoPoint::new(-3.0, -3.0)));
        index.assign(&mut record);
        assert_eq!(record.neighborhood_id, None);
    }
}
