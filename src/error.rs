// src/error.rs
use std::path::PathBuf;

/// Errors raised while loading catalog data or materializing images
#[derive(Debug, thiserror::Error)]
pub enum FloodError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Image collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Band '{band}' not present in image (available: {available})")]
    MissingBand { band: String, available: String },

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid visualization: {0}")]
    InvalidVisualization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Reader failure: {0}")]
    Reader(String),
}

pub type Result<T> = std::result::Result<T, FloodError>;
