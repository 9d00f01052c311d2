// src/processing/raster.rs
use gdal::raster::Buffer;

use crate::error::{FloodError, Result};
use crate::io::GeoInfo;

/// One materialized band: f32 samples plus a validity mask.
///
/// A `false` mask entry is nodata; its sample value is meaningless.
#[derive(Debug, Clone)]
pub struct Band {
    name: String,
    values: Buffer<f32>,
    mask: Vec<bool>,
}

impl Band {
    pub fn new(name: &str, width: usize, height: usize, values: Vec<f32>, mask: Vec<bool>) -> Self {
        debug_assert_eq!(values.len(), width * height);
        debug_assert_eq!(mask.len(), width * height);
        Self {
            name: name.to_string(),
            values: Buffer::new((width, height), values),
            mask,
        }
    }

    /// All pixels valid except NaN samples
    pub fn from_values(name: &str, width: usize, height: usize, values: Vec<f32>) -> Self {
        let mask = values.iter().map(|v| !v.is_nan()).collect();
        Self::new(name, width, height, values, mask)
    }

    /// Every pixel masked
    pub fn masked(name: &str, width: usize, height: usize) -> Self {
        let len = width * height;
        Self::new(name, width, height, vec![0.0; len], vec![false; len])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// (width, height)
    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    pub fn values(&self) -> &[f32] {
        self.values.data()
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Sample at `idx`, `None` when masked
    pub fn get(&self, idx: usize) -> Option<f32> {
        if self.mask[idx] {
            Some(self.values.data()[idx])
        } else {
            None
        }
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

/// A materialized multi-band image on a single grid
#[derive(Debug, Clone)]
pub struct Raster {
    geo: GeoInfo,
    bands: Vec<Band>,
}

impl Raster {
    pub fn new(geo: GeoInfo, bands: Vec<Band>) -> Result<Self> {
        let expected = geo.pixel_count();
        if let Some(bad) = bands.iter().find(|b| b.len() != expected) {
            return Err(FloodError::GridMismatch(format!(
                "band {} has {} pixels, grid has {}",
                bad.name(),
                bad.len(),
                expected
            )));
        }
        Ok(Self { geo, bands })
    }

    pub fn geo(&self) -> &GeoInfo {
        &self.geo
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(Band::name).collect()
    }

    pub fn band(&self, name: &str) -> Result<&Band> {
        self.bands
            .iter()
            .find(|b| b.name() == name)
            .ok_or_else(|| FloodError::MissingBand {
                band: name.to_string(),
                available: self.band_names().join(", "),
            })
    }

    /// The first band, for single-band images
    pub fn first(&self) -> Result<&Band> {
        self.bands.first().ok_or_else(|| FloodError::MissingBand {
            band: "<any>".to_string(),
            available: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: usize, height: usize) -> GeoInfo {
        GeoInfo {
            projection: String::new(),
            geo_transform: [0.0, 1.0, 0.0, 0.0, 0.0, -1.0],
            width,
            height,
        }
    }

    #[test]
    fn nan_samples_are_masked() {
        let band = Band::from_values("B3", 2, 1, vec![0.5, f32::NAN]);
        assert_eq!(band.get(0), Some(0.5));
        assert_eq!(band.get(1), None);
        assert_eq!(band.valid_count(), 1);
    }

    #[test]
    fn missing_band_lists_available() {
        let raster = Raster::new(grid(1, 1), vec![Band::from_values("B3", 1, 1, vec![1.0])]).unwrap();
        let err = raster.band("B8").unwrap_err();
        assert!(err.to_string().contains("B3"));
    }

    #[test]
    fn rejects_band_of_wrong_size() {
        let result = Raster::new(grid(2, 2), vec![Band::masked("B3", 1, 1)]);
        assert!(matches!(result, Err(FloodError::GridMismatch(_))));
    }
}
