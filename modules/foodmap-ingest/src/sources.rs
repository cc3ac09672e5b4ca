//! Source descriptors: one per upstream dataset.
//!
//! Each descriptor carries the constants and column-alias lists that make a
//! raw CSV row resolvable into the canonical record shape. Alias lists are
//! ordered; the first candidate present in the row wins.

use clap::ValueEnum;

use foodmap_common::types::PlaceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    FarmersMarkets,
    FoodPantries,
    GroceryStores,
    Restaurants,
}

/// Static description of one upstream dataset.
pub struct SourceSpec {
    pub source_name: &'static str,
    pub source_file: &'static str,
    pub datatype: &'static str,
    pub place_type: PlaceType,
    /// Non-CSV prelude lines before the header row.
    pub skip_rows: usize,
    pub name_aliases: &'static [&'static str],
    pub line1_aliases: &'static [&'static str],
    pub city_aliases: &'static [&'static str],
    pub zip_aliases: &'static [&'static str],
    /// Rows natively carry latitude/longitude columns.
    pub has_native_coords: bool,
}

impl SourceSpec {
    /// 1-based line number of the first data row in the source file:
    /// prelude lines, then the header, then data.
    pub fn first_data_line(&self) -> u64 {
        self.skip_rows as u64 + 2
    }
}

pub const ZIP_ALIASES: &[&str] = &["Zip", "ZIP", "Zip Code", "Postal Code", "zipcode"];
pub const CITY_ALIASES: &[&str] = &["City", "Town"];

const FARMERS_MARKETS: SourceSpec = SourceSpec {
    source_name: "MassGrown",
    source_file: "farmers_market.csv",
    datatype: "farmers market",
    place_type: PlaceType::FarmersMarket,
    skip_rows: 2,
    name_aliases: &["LocationName", "Location Name", "Name"],
    line1_aliases: &["Address", "Street Address", "Location Address"],
    city_aliases: CITY_ALIASES,
    zip_aliases: ZIP_ALIASES,
    has_native_coords: false,
};

const FOOD_PANTRIES: SourceSpec = SourceSpec {
    source_name: "SuffolkFoodPantries",
    source_file: "suffolk_active_food_pantries.csv",
    datatype: "food pantry",
    place_type: PlaceType::FoodPantry,
    skip_rows: 0,
    name_aliases: &["Name"],
    line1_aliases: &["Street", "Address", "Street Address"],
    city_aliases: CITY_ALIASES,
    zip_aliases: ZIP_ALIASES,
    has_native_coords: false,
};

const GROCERY_STORES: SourceSpec = SourceSpec {
    source_name: "BostonGroceryStores",
    source_file: "grocery_store_locations_clean.csv",
    datatype: "grocery store",
    place_type: PlaceType::GroceryStore,
    skip_rows: 0,
    name_aliases: &["Store Name", "Name"],
    line1_aliases: &["Address", "Street Address", "Street"],
    city_aliases: CITY_ALIASES,
    zip_aliases: ZIP_ALIASES,
    has_native_coords: true,
};

const RESTAURANTS: SourceSpec = SourceSpec {
    source_name: "BostonRestaurants",
    source_file: "restaurants_cleaned.csv",
    datatype: "restaurant",
    place_type: PlaceType::Restaurant,
    skip_rows: 0,
    name_aliases: &["dbaname", "DBA Name"],
    line1_aliases: &["address", "street", "street address"],
    city_aliases: CITY_ALIASES,
    zip_aliases: ZIP_ALIASES,
    has_native_coords: true,
};

impl SourceKind {
    pub fn spec(&self) -> &'static SourceSpec {
        match self {
            SourceKind::FarmersMarkets => &FARMERS_MARKETS,
            SourceKind::FoodPantries => &FOOD_PANTRIES,
            SourceKind::GroceryStores => &GROCERY_STORES,
            SourceKind::Restaurants => &RESTAURANTS,
        }
    }
}

pub const LAT_ALIASES: &[&str] = &["Latitude", "Lat"];
pub const LNG_ALIASES: &[&str] = &["Longitude", "Lng", "Long", "Lon"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_data_line_accounts_for_prelude() {
        assert_eq!(SourceKind::FarmersMarkets.spec().first_data_line(), 4);
        assert_eq!(SourceKind::FoodPantries.spec().first_data_line(), 2);
    }

    #[test]
    fn specs_cover_all_sources() {
        for kind in [
            SourceKind::FarmersMarkets,
            SourceKind::FoodPantries,
            SourceKind::GroceryStores,
            SourceKind::Restaurants,
        ] {
            let spec = kind.spec();
            assert!(!spec.name_aliases.is_empty());
            assert!(!spec.line1_aliases.is_empty());
        }
    }
}
