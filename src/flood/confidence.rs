// src/flood/confidence.rs
use std::sync::Arc;

use crate::config::{MNDWI_THRESHOLD, NDWI_THRESHOLD};
use crate::processing::indices::{MNDWI, NDWI};
use crate::processing::Image;

pub const CONFIDENCE_BAND: &str = "confidence";

/// NDWI and MNDWI of an image with Sentinel-2 green/NIR/SWIR bands
pub fn water_indices(image: &Image) -> (Image, Image) {
    let ndwi = image.index(Arc::new(NDWI::sentinel2()));
    let mndwi = image.index(Arc::new(MNDWI::sentinel2()));
    (ndwi, mndwi)
}

/// Binary water confidence: 1 where NDWI > 0.3 and MNDWI > 0.2, else 0.
///
/// The two thresholded indices are summed (0, 1 or 2) and only 2 maps to
/// water, so a single index alone never marks a pixel as water.
pub fn calculate_confidence(image: &Image) -> Image {
    let (ndwi, mndwi) = water_indices(image);

    let ndwi_water = ndwi.gt(NDWI_THRESHOLD);
    let mndwi_water = mndwi.gt(MNDWI_THRESHOLD);

    ndwi_water
        .add(&mndwi_water)
        .remap(&[0.0, 1.0, 2.0], &[0.0, 0.0, 1.0])
        .rename(&[CONFIDENCE_BAND])
}
