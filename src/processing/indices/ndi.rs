// src/processing/indices/ndi.rs
use super::IndexCalculator;
use crate::error::Result;
use crate::processing::ops::normalized_difference;
use crate::processing::{Band, Raster};

/// Normalized Difference Index (NDI) calculator: (A - B) / (A + B)
pub struct NDI {
    band_a: String,
    band_b: String,
    name: String,
}

impl NDI {
    pub fn new(band_a: &str, band_b: &str, name: Option<String>) -> Self {
        Self {
            band_a: band_a.to_string(),
            band_b: band_b.to_string(),
            name: name.unwrap_or_else(|| "nd".to_string()),
        }
    }
}

impl IndexCalculator for NDI {
    fn calculate(&self, image: &Raster) -> Result<Band> {
        let a = image.band(&self.band_a)?;
        let b = image.band(&self.band_b)?;
        normalized_difference(a, b, &self.name)
    }

    fn required_bands(&self) -> Vec<&str> {
        vec![self.band_a.as_str(), self.band_b.as_str()]
    }

    fn name(&self) -> &str {
        &self.name
    }
}
