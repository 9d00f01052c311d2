// src/flood/pipeline.rs
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::change::{detect_flooding, FLOODED_BAND};
use super::composite::build_composite;
use super::confidence::calculate_confidence;
use crate::config::FloodConfig;
use crate::error::Result;
use crate::geometry::StudyArea;
use crate::io::writer::Encoding;
use crate::io::{write_band, OutputOptions};
use crate::processing::{Engine, Image};
use crate::render::{MapManifest, MapView, VisParams};

pub const FLOOD_MASK_FILE: &str = "flood_mask.tif";

pub const PRE_LAYER: &str = "Pre-Flood False Color";
pub const POST_LAYER: &str = "Post-Flood False Color";
pub const FLOOD_LAYER: &str = "Flooded Area";

/// Summary of a detection run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FloodStats {
    /// Pixels with a valid confidence on both dates
    pub valid_pixels: usize,
    pub flooded_pixels: usize,
    /// Flooded area in squared CRS units
    pub flooded_area: f64,
}

impl FloodStats {
    pub fn flooded_fraction(&self) -> f64 {
        if self.valid_pixels == 0 {
            0.0
        } else {
            self.flooded_pixels as f64 / self.valid_pixels as f64
        }
    }
}

/// The two-date flood workflow as a set of lazy image handles
pub struct FloodPipeline {
    config: FloodConfig,
    area: Arc<StudyArea>,
    pre_composite: Image,
    post_composite: Image,
    pre_confidence: Image,
    post_confidence: Image,
    flood_mask: Image,
}

impl FloodPipeline {
    pub fn new(config: FloodConfig, area: StudyArea) -> Self {
        let area = Arc::new(area);

        let pre_composite = build_composite(&config.collection, &area, config.pre_flood, config.cloud_ceiling);
        let post_composite = build_composite(&config.collection, &area, config.post_flood, config.cloud_ceiling);

        let pre_confidence = calculate_confidence(&pre_composite);
        let post_confidence = calculate_confidence(&post_composite);

        let flood_mask = detect_flooding(&pre_confidence, &post_confidence);

        Self {
            config,
            area,
            pre_composite,
            post_composite,
            pre_confidence,
            post_confidence,
            flood_mask,
        }
    }

    pub fn config(&self) -> &FloodConfig {
        &self.config
    }

    pub fn area(&self) -> &Arc<StudyArea> {
        &self.area
    }

    pub fn pre_composite(&self) -> &Image {
        &self.pre_composite
    }

    pub fn post_composite(&self) -> &Image {
        &self.post_composite
    }

    pub fn pre_confidence(&self) -> &Image {
        &self.pre_confidence
    }

    pub fn post_confidence(&self) -> &Image {
        &self.post_confidence
    }

    pub fn flood_mask(&self) -> &Image {
        &self.flood_mask
    }

    /// Map with both false-color composites (hidden) under the flood layer
    pub fn map_view(&self) -> Result<MapView> {
        let mut map = MapView::new();
        map.center_object(&self.area, self.config.map_zoom)?;
        map.add_layer(&self.pre_composite, VisParams::false_color(), PRE_LAYER, false);
        map.add_layer(&self.post_composite, VisParams::false_color(), POST_LAYER, false);
        map.add_layer(&self.flood_mask, VisParams::palette(&["blue"])?, FLOOD_LAYER, true);
        Ok(map)
    }

    /// Count valid and flooded pixels
    pub fn stats(&self, engine: &Engine) -> Result<FloodStats> {
        let pre = engine.evaluate(&self.pre_confidence)?;
        let post = engine.evaluate(&self.post_confidence)?;
        let flood = engine.evaluate(&self.flood_mask)?;

        let valid_pixels = pre
            .first()?
            .mask()
            .iter()
            .zip(post.first()?.mask())
            .filter(|(&a, &b)| a && b)
            .count();
        let flooded_pixels = flood.band(FLOODED_BAND)?.valid_count();

        Ok(FloodStats {
            valid_pixels,
            flooded_pixels,
            flooded_area: flooded_pixels as f64 * flood.geo().pixel_area(),
        })
    }

    /// Materialize everything: write the flood mask, render the map and
    /// return the run statistics.
    pub fn run(&self, engine: &Engine, out_dir: &Path, options: &OutputOptions) -> Result<(FloodStats, MapManifest)> {
        let start = Instant::now();
        log::info!(
            "Detecting floods over {} between {} and {}",
            self.area.id(),
            self.config.pre_flood,
            self.config.post_flood
        );
        std::fs::create_dir_all(out_dir)?;

        let flood = engine.evaluate(&self.flood_mask)?;
        let mask_path = out_dir.join(FLOOD_MASK_FILE);
        write_band(flood.band(FLOODED_BAND)?, flood.geo(), &mask_path, Encoding::Byte, options)?;
        log::info!("Wrote {}", mask_path.display());

        let manifest = self.map_view()?.render(engine, out_dir, options)?;

        let stats = self.stats(engine)?;
        log::info!(
            "Flooded {} of {} valid pixels ({:.2}%), area {:.1}",
            stats.flooded_pixels,
            stats.valid_pixels,
            stats.flooded_fraction() * 100.0,
            stats.flooded_area
        );
        log::info!("Detection finished in {:.2?}", start.elapsed());

        Ok((stats, manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn area() -> StudyArea {
        let square = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)];
        StudyArea::new("test/area", MultiPolygon(vec![square])).unwrap()
    }

    #[test]
    fn map_layers_in_drawing_order() {
        let pipeline = FloodPipeline::new(FloodConfig::default(), area());
        let map = pipeline.map_view().unwrap();
        assert_eq!(map.layer_names(), vec![PRE_LAYER, POST_LAYER, FLOOD_LAYER]);
        let center = map.center().unwrap();
        assert_eq!((center.x, center.y, center.zoom), (5.0, 5.0, 6.5));
    }

    #[test]
    fn confidences_share_the_flood_graph() {
        let pipeline = FloodPipeline::new(FloodConfig::default(), area());
        let described = format!("{:?}", pipeline.flood_mask());
        assert!(described.contains("filter_date(2022-01-01..2022-01-30)"));
        assert!(described.contains("filter_date(2022-09-01..2022-09-30)"));
        assert!(described.contains("CLOUDY_PIXEL_PERCENTAGE Lt 20"));
    }

    #[test]
    fn flooded_fraction_of_empty_run_is_zero() {
        let stats = FloodStats {
            valid_pixels: 0,
            flooded_pixels: 0,
            flooded_area: 0.0,
        };
        assert_eq!(stats.flooded_fraction(), 0.0);
    }
}
