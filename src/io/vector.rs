// src/io/vector.rs
use gdal::vector::LayerAccess;
use gdal::Dataset;
use std::path::Path;

use crate::error::{FloodError, Result};
use crate::geometry::StudyArea;

/// Read every feature geometry of every layer of a vector dataset
/// (GeoJSON, GeoPackage, Shapefile, ...) into a study area.
pub fn read_study_area(path: &Path, id: &str) -> Result<StudyArea> {
    log::info!("Reading study area {} from {}", id, path.display());
    let dataset = Dataset::open(path)?;

    let mut geometries = Vec::new();
    for mut layer in dataset.layers() {
        for feature in layer.features() {
            if let Some(geometry) = feature.geometry() {
                let geometry = geometry
                    .to_geo()
                    .map_err(|e| FloodError::InvalidGeometry(format!("{}: {}", id, e)))?;
                geometries.push(geometry);
            }
        }
    }
    log::debug!("Study area {} has {} geometries", id, geometries.len());

    StudyArea::from_geometries(id, geometries)
}
