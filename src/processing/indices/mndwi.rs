// src/processing/indices/mndwi.rs
use super::IndexCalculator;
use crate::config::{GREEN_BAND, SWIR_BAND};
use crate::error::Result;
use crate::processing::ops::normalized_difference;
use crate::processing::{Band, Raster};

/// Modified Normalized Difference Water Index (MNDWI) calculator.
///
/// Swaps NIR for SWIR, which separates open water from built-up surfaces
/// better than NDWI.
pub struct MNDWI {
    green: String,
    swir: String,
    name: String,
}

impl MNDWI {
    pub fn new(green: &str, swir: &str, name: Option<String>) -> Self {
        Self {
            green: green.to_string(),
            swir: swir.to_string(),
            name: name.unwrap_or_else(|| "MNDWI".to_string()),
        }
    }

    /// Sentinel-2 green (B3) and SWIR 1 (B11)
    pub fn sentinel2() -> Self {
        Self::new(GREEN_BAND, SWIR_BAND, None)
    }
}

impl IndexCalculator for MNDWI {
    fn calculate(&self, image: &Raster) -> Result<Band> {
        let green = image.band(&self.green)?;
        let swir = image.band(&self.swir)?;
        normalized_difference(green, swir, &self.name)
    }

    fn required_bands(&self) -> Vec<&str> {
        vec![self.green.as_str(), self.swir.as_str()]
    }

    fn name(&self) -> &str {
        &self.name
    }
}
