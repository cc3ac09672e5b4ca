use thiserror::Error;

#[derive(Error, Debug)]
pub enum FoodmapError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Geocoding error: {0}")]
    Geocode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Boundary data error: {0}")]
    BoundaryData(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
