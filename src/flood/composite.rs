// src/flood/composite.rs
use std::sync::Arc;

use crate::config::{DateWindow, CLOUD_PROPERTY, GREEN_BAND, NIR_BAND, SWIR_BAND};
use crate::geometry::StudyArea;
use crate::processing::{Collection, Image, MetadataFilter};

/// Green, NIR and SWIR of the scenes of `collection_id` over the area,
/// inside the window and under the cloud ceiling
pub fn scenes_for(
    collection_id: &str,
    area: &Arc<StudyArea>,
    window: DateWindow,
    cloud_ceiling: f64,
) -> Collection {
    Collection::load(collection_id)
        .filter_bounds(area)
        .filter_date(window)
        .filter(MetadataFilter::lt(CLOUD_PROPERTY, cloud_ceiling))
        .select(&[GREEN_BAND, NIR_BAND, SWIR_BAND])
}

/// Mean composite of the filtered scenes, clipped to the area.
///
/// When no scene passes the filters the composite is fully masked.
pub fn build_composite(
    collection_id: &str,
    area: &Arc<StudyArea>,
    window: DateWindow,
    cloud_ceiling: f64,
) -> Image {
    scenes_for(collection_id, area, window, cloud_ceiling)
        .mean()
        .clip(area)
}
