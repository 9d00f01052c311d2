// src/processing/indices/ndwi.rs
use super::IndexCalculator;
use crate::config::{GREEN_BAND, NIR_BAND};
use crate::error::Result;
use crate::processing::ops::normalized_difference;
use crate::processing::{Band, Raster};

/// Normalized Difference Water Index (NDWI) calculator
pub struct NDWI {
    green: String,
    nir: String,
    name: String,
}

impl NDWI {
    pub fn new(green: &str, nir: &str, name: Option<String>) -> Self {
        Self {
            green: green.to_string(),
            nir: nir.to_string(),
            name: name.unwrap_or_else(|| "NDWI".to_string()),
        }
    }

    /// Sentinel-2 green (B3) and NIR (B8)
    pub fn sentinel2() -> Self {
        Self::new(GREEN_BAND, NIR_BAND, None)
    }
}

impl IndexCalculator for NDWI {
    fn calculate(&self, image: &Raster) -> Result<Band> {
        // (GREEN - NIR) / (GREEN + NIR)
        let green = image.band(&self.green)?;
        let nir = image.band(&self.nir)?;
        normalized_difference(green, nir, &self.name)
    }

    fn required_bands(&self) -> Vec<&str> {
        vec![self.green.as_str(), self.nir.as_str()]
    }

    fn name(&self) -> &str {
        &self.name
    }
}
