//! Row normalization: raw CSV rows into the canonical place record.
//!
//! Identical inputs always yield identical records, dedupe keys included.
//! Validation failures are values, not panics; the pipeline turns them into
//! rejects without touching the rest of the batch.

use thiserror::Error;

use foodmap_common::canonical::{
    clean_text, collapse_whitespace, content_hash, normalize_city, normalize_phone,
    normalize_website, normalize_zip, slugify, source_prefix, title_case_city,
};
use foodmap_common::types::{
    Address, Contact, GeoPoint, Geocoding, PlaceRecord, SourceEntry,
};

use crate::reader::RawRow;
use crate::sources::{SourceKind, LAT_ALIASES, LNG_ALIASES};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn missing(field: &str) -> Self {
        Self(format!("missing required field: {field}"))
    }
}

fn parse_float(value: Option<&str>) -> Option<f64> {
    clean_text(value)?.parse().ok()
}

/// Subtype from an explicit type/description column, slugified, with a
/// per-source default when blank.
fn slug_subtype(text: Option<&str>, default: &str) -> String {
    match text {
        Some(t) => {
            let slug = slugify(t);
            if slug.is_empty() {
                default.to_string()
            } else {
                slug
            }
        }
        None => default.to_string(),
    }
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token == word)
}

/// Keyword heuristics over name and description for farmers markets.
fn farmers_market_subtype(name: &str, description: Option<&str>) -> String {
    let n = name.to_lowercase();
    let d = description.unwrap_or_default().to_lowercase();
    let pickup = |s: &str| s.contains("pick-up") || s.contains("pick up");
    if contains_word(&n, "csa") || contains_word(&d, "csa") || pickup(&n) || pickup(&d) {
        return "csa_pickup".to_string();
    }
    if n.contains("mobile market") {
        return "mobile_market".to_string();
    }
    if n.contains("farmstand") || d.contains("farmstand") {
        return "farmstand".to_string();
    }
    "farmers_market".to_string()
}

/// Restaurant phones arrive as float-looking strings ("6174345000.0") and
/// sometimes as all zeros; both are cleaned before the shared rules apply.
fn restaurant_phone(value: Option<&str>) -> Option<String> {
    let raw = clean_text(value)?;
    let raw = match raw.split_once('.') {
        Some((head, tail))
            if !head.is_empty()
                && head.chars().all(|c| c.is_ascii_digit())
                && !tail.is_empty()
                && tail.chars().all(|c| c == '0') =>
        {
            head.to_string()
        }
        _ => raw,
    };
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() || digits.chars().all(|c| c == '0') {
        return None;
    }
    normalize_phone(Some(&raw))
}

pub fn normalize_row(kind: SourceKind, row: &RawRow) -> Result<PlaceRecord, ValidationError> {
    let spec = kind.spec();
    let raw = row.to_json();

    let name = match kind {
        // DBA name preferred, business name fallback
        SourceKind::Restaurants => clean_text(row.get(spec.name_aliases)).or_else(|| {
            clean_text(row.get(&["businessname", "Business Name", "Name"]))
        }),
        _ => clean_text(row.get(spec.name_aliases)),
    };
    let line1 = clean_text(row.get(spec.line1_aliases));

    let (city_raw, city_norm) = match kind {
        SourceKind::FarmersMarkets => {
            let city_raw = clean_text(row.get(spec.city_aliases));
            let city_norm = city_raw.as_deref().map(title_case_city);
            (city_raw, city_norm)
        }
        _ => normalize_city(row.get(spec.city_aliases)),
    };

    let state = match kind {
        SourceKind::FarmersMarkets => "MA".to_string(),
        _ => clean_text(row.get(&["State"]))
            .map(|s| s.to_uppercase())
            .unwrap_or_else(|| "MA".to_string()),
    };
    let zip = normalize_zip(row.get(spec.zip_aliases));

    let name = name.ok_or_else(|| ValidationError::missing("name"))?;
    let line1 = line1.ok_or_else(|| ValidationError::missing("address.line1"))?;
    let line1 = collapse_whitespace(&line1);

    let city_for_key = city_norm
        .as_deref()
        .or(city_raw.as_deref())
        .unwrap_or("boston");
    let zip_for_key = zip.as_deref().unwrap_or("");

    let dedupe_hash = content_hash(&[
        spec.source_name,
        &name,
        &line1,
        city_for_key,
        &state,
        zip_for_key,
    ]);
    let dedupe_key = format!("{}:{dedupe_hash}", source_prefix(spec.source_name));
    let source_row_hash = content_hash(&[
        spec.source_name,
        &name,
        &line1,
        city_raw.as_deref().unwrap_or(""),
        &state,
        zip_for_key,
    ]);

    let (description, subtype, contact) = match kind {
        SourceKind::FarmersMarkets => {
            let description = clean_text(row.get(&["Description"]));
            let subtype = farmers_market_subtype(&name, description.as_deref());
            let contact = Contact {
                website: normalize_website(row.get(&["Website", "URL", "Url"])),
                phone: normalize_phone(row.get(&["Phone", "Phone Number", "Telephone"])),
            };
            (description, subtype, contact)
        }
        SourceKind::FoodPantries => {
            let type_desc = clean_text(row.get(&["Type_Desc", "Type Desc", "Type"]));
            let status = clean_text(row.get(&["Status"]));
            let county = clean_text(row.get(&["County"]));
            let subtype = slug_subtype(type_desc.as_deref(), "food_pantry");
            (type_desc.or(status).or(county), subtype, Contact::default())
        }
        SourceKind::GroceryStores => {
            let store_type = clean_text(row.get(&["Store Type", "Type"]));
            let county = clean_text(row.get(&["County"]));
            let subtype = slug_subtype(store_type.as_deref(), "grocery_store");
            (store_type.or(county), subtype, Contact::default())
        }
        SourceKind::Restaurants => {
            let description = clean_text(row.get(&["descript", "description"]));
            let subtype = slug_subtype(description.as_deref(), "restaurant");
            let contact = Contact {
                website: None,
                phone: restaurant_phone(row.get(&["dayphn_cleaned", "phone", "phone number"])),
            };
            (description, subtype, contact)
        }
    };

    let coords = if spec.has_native_coords {
        let lat = parse_float(row.get(LAT_ALIASES));
        let lng = parse_float(row.get(LNG_ALIASES));
        lat.zip(lng)
    } else {
        None
    };

    let (location, geocoding, needs_geocoding) = match (kind, coords) {
        (_, Some((lat, lng))) => (
            Some(GeoPoint::new(lng, lat)),
            Geocoding::source_coordinates(),
            false,
        ),
        (SourceKind::Restaurants, None) => {
            (None, Geocoding::missing_source_coordinates(), true)
        }
        (_, None) => (None, Geocoding::not_requested(), true),
    };

    Ok(PlaceRecord {
        dedupe_key,
        name,
        datatype: spec.datatype.to_string(),
        place_type: spec.place_type,
        subtype,
        description,
        address: Address {
            line1,
            city_raw,
            city_norm,
            state,
            zip,
            formatted_address: None,
        },
        location,
        geocoding,
        contact,
        neighborhood_id: None,
        neighborhood_name: None,
        sources: vec![SourceEntry {
            source_name: spec.source_name.to_string(),
            source_file: spec.source_file.to_string(),
            source_row_hash,
            needs_geocoding,
            raw,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodmap_common::types::{Confidence, GeocodeStatus};

    fn row(line: u64, cols: &[(&str, &str)]) -> RawRow {
        RawRow::new(
            line,
            cols.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn farmers_market_row_normalizes() {
        let row = row(
            4,
            &[
                ("Location Name", "  Dudley   Town Common "),
                ("Address", "10 Warren St"),
                ("City", "roxbury"),
                ("Zip", "02119-1234"),
                ("Website", "www.massgrown.example"),
                ("Phone", "(617) 555-0101"),
            ],
        );
        let record = normalize_row(SourceKind::FarmersMarkets, &row).unwrap();

        assert_eq!(record.name, "Dudley   Town Common");
        assert_eq!(record.address.line1, "10 Warren St");
        assert_eq!(record.address.city_norm.as_deref(), Some("Roxbury"));
        assert_eq!(record.address.state, "MA");
        assert_eq!(record.address.zip.as_deref(), Some("02119"));
        assert_eq!(record.subtype, "farmers_market");
        assert_eq!(record.datatype, "farmers market");
        assert_eq!(
            record.contact.website.as_deref(),
            Some("https://www.massgrown.example")
        );
        assert_eq!(record.contact.phone.as_deref(), Some("+16175550101"));
        assert!(record.dedupe_key.starts_with("massgrown:"));
        assert_eq!(record.geocoding.status, GeocodeStatus::NotRequested);
        assert!(record.location.is_none());
        assert!(record.sources[0].needs_geocoding);
    }

    #[test]
    fn normalization_is_deterministic() {
        let cols = [
            ("Location Name", "Copley Square Farmers Market"),
            ("Address", "139  St James Ave"),
            ("City", "Boston"),
            ("Zip", "02116"),
        ];
        let a = normalize_row(SourceKind::FarmersMarkets, &row(4, &cols)).unwrap();
        let b = normalize_row(SourceKind::FarmersMarkets, &row(9, &cols)).unwrap();
        assert_eq!(a.dedupe_key, b.dedupe_key);
        assert_eq!(a.sources[0].source_row_hash, b.sources[0].source_row_hash);
    }

    #[test]
    fn missing_required_fields_reject() {
        let no_name = row(4, &[("Address", "10 Warren St")]);
        let err = normalize_row(SourceKind::FarmersMarkets, &no_name).unwrap_err();
        assert_eq!(err.0, "missing required field: name");

        let blank_line1 = row(4, &[("Name", "Somewhere"), ("Address", "   ")]);
        let err = normalize_row(SourceKind::FarmersMarkets, &blank_line1).unwrap_err();
        assert_eq!(err.0, "missing required field: address.line1");
    }

    #[test]
    fn farmers_market_subtype_keywords() {
        assert_eq!(farmers_market_subtype("Riverside CSA", None), "csa_pickup");
        assert_eq!(
            farmers_market_subtype("Veggie Pick-Up Spot", None),
            "csa_pickup"
        );
        assert_eq!(
            farmers_market_subtype("Fresh Truck Mobile Market", None),
            "mobile_market"
        );
        assert_eq!(
            farmers_market_subtype("Allandale Farmstand", None),
            "farmstand"
        );
        // "csa" must be a whole word
        assert_eq!(
            farmers_market_subtype("Casablanca Market", None),
            "farmers_market"
        );
    }

    #[test]
    fn pantry_subtype_and_description_fallbacks() {
        let full = row(
            2,
            &[
                ("Name", "Hope Pantry"),
                ("Street", "55 Blue Hill Ave"),
                ("Type_Desc", "Mobile Pantry & Shelter"),
                ("Status", "Active"),
                ("County", "Suffolk"),
            ],
        );
        let record = normalize_row(SourceKind::FoodPantries, &full).unwrap();
        assert_eq!(record.subtype, "mobile_pantry_and_shelter");
        assert_eq!(record.description.as_deref(), Some("Mobile Pantry & Shelter"));

        let sparse = row(
            2,
            &[
                ("Name", "Hope Pantry"),
                ("Street", "55 Blue Hill Ave"),
                ("County", "Suffolk"),
            ],
        );
        let record = normalize_row(SourceKind::FoodPantries, &sparse).unwrap();
        assert_eq!(record.subtype, "food_pantry");
        assert_eq!(record.description.as_deref(), Some("Suffolk"));
    }

    #[test]
    fn grocery_with_native_coordinates() {
        let record = normalize_row(
            SourceKind::GroceryStores,
            &row(
                2,
                &[
                    ("Store Name", "Daily Table"),
                    ("Address", "450 Washington St"),
                    ("City", "Dorchester/"),
                    ("Latitude", "42.2900"),
                    ("Longitude", "-71.0715"),
                ],
            ),
        )
        .unwrap();

        assert_eq!(record.geocoding.status, GeocodeStatus::SourceCoordinates);
        assert_eq!(record.geocoding.provider, "source_csv");
        assert_eq!(record.geocoding.confidence, Some(Confidence::High));
        assert_eq!(record.lng_lat(), Some((-71.0715, 42.2900)));
        assert!(!record.sources[0].needs_geocoding);
        // trailing slash stripped by city normalization
        assert_eq!(record.address.city_raw.as_deref(), Some("Dorchester"));
    }

    #[test]
    fn grocery_without_coordinates_falls_back_to_geocoder() {
        let record = normalize_row(
            SourceKind::GroceryStores,
            &row(
                2,
                &[("Store Name", "Corner Market"), ("Address", "1 Main St")],
            ),
        )
        .unwrap();
        assert_eq!(record.geocoding.status, GeocodeStatus::NotRequested);
        assert_eq!(record.geocoding.provider, "google");
        assert!(record.sources[0].needs_geocoding);
    }

    #[test]
    fn restaurant_name_and_missing_coordinates() {
        let record = normalize_row(
            SourceKind::Restaurants,
            &row(
                2,
                &[
                    ("businessname", "Acme Hospitality LLC"),
                    ("dbaname", ""),
                    ("address", "100 Hanover St"),
                    ("descript", "Eating & Drinking"),
                    ("dayphn_cleaned", "6175550147.0"),
                ],
            ),
        )
        .unwrap();

        assert_eq!(record.name, "Acme Hospitality LLC");
        assert_eq!(record.subtype, "eating_and_drinking");
        assert_eq!(
            record.geocoding.status,
            GeocodeStatus::MissingSourceCoordinates
        );
        assert_eq!(record.geocoding.provider, "source_csv");
        assert_eq!(record.geocoding.confidence, None);
        assert_eq!(record.contact.phone.as_deref(), Some("+16175550147"));
        assert!(record.sources[0].needs_geocoding);
    }

    #[test]
    fn restaurant_zero_phone_is_dropped() {
        assert_eq!(restaurant_phone(Some("0000000000")), None);
        assert_eq!(restaurant_phone(Some("0.0")), None);
        assert_eq!(restaurant_phone(Some("6175550147.0")), Some("+16175550147".to_string()));
    }
}
