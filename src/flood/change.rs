// src/flood/change.rs
use crate::processing::Image;

pub const FLOODED_BAND: &str = "flooded";

/// Newly flooded pixels: water after the event, not water before.
///
/// The difference of the two confidence images is 1 only for a 0 -> 1
/// transition; every other pixel (persistent water, persistent land,
/// receded water) is masked. Valid pixels therefore all hold 1.
pub fn detect_flooding(pre_confidence: &Image, post_confidence: &Image) -> Image {
    let difference = post_confidence.subtract(pre_confidence);
    difference
        .update_mask(&difference.eq(1.0))
        .rename(&[FLOODED_BAND])
}
