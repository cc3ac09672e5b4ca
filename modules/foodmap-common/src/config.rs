use std::env;
use std::str::FromStr;

use crate::error::FoodmapError;
use crate::types::StoreMode;

/// Ingest configuration loaded from environment variables.
///
/// Loading is lenient; requirements depend on the run (no database without
/// persistence, no API key without geocoding), so the binary asks for what
/// it needs via the `require_*` accessors and fails before reading any row.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub store_mode: StoreMode,
}

impl Config {
    pub fn from_env() -> Result<Self, FoodmapError> {
        let store_mode = match env::var("GEOCODE_STORE_MODE") {
            Ok(raw) => StoreMode::from_str(&raw)
                .map_err(|e| FoodmapError::Config(format!("GEOCODE_STORE_MODE: {e}")))?,
            Err(_) => StoreMode::StoreCoords,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY").ok(),
            store_mode,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, FoodmapError> {
        self.database_url.as_deref().ok_or_else(|| {
            FoodmapError::Config(
                "DATABASE_URL is required unless --dry-run is used".to_string(),
            )
        })
    }

    pub fn require_api_key(&self) -> Result<&str, FoodmapError> {
        self.google_maps_api_key.as_deref().ok_or_else(|| {
            FoodmapError::Config(
                "GOOGLE_MAPS_API_KEY is required unless --no-geocode is set".to_string(),
            )
        })
    }
}
