// src/render/map.rs
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::visualize::VisParams;
use crate::error::{FloodError, Result};
use crate::geometry::StudyArea;
use crate::io::{write_rgba, OutputOptions};
use crate::processing::{Engine, Image};

pub const MANIFEST_FILE: &str = "map.json";

struct Layer {
    name: String,
    image: Image,
    shown: bool,
}

/// Map center in the study area's CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapCenter {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerEntry {
    pub name: String,
    pub file: PathBuf,
    pub shown: bool,
}

/// `map.json`: what a viewer needs to display the rendered layers
#[derive(Debug, Clone, Serialize)]
pub struct MapManifest {
    pub center: Option<MapCenter>,
    pub projection: String,
    pub layers: Vec<LayerEntry>,
}

/// Layer stack of an interactive map, rendered to RGBA GeoTIFFs
#[derive(Default)]
pub struct MapView {
    center: Option<MapCenter>,
    layers: Vec<Layer>,
}

impl MapView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Center on the centroid of the area
    pub fn center_object(&mut self, area: &StudyArea, zoom: f64) -> Result<()> {
        let c = area.centroid()?;
        self.center = Some(MapCenter { x: c.x(), y: c.y(), zoom });
        Ok(())
    }

    pub fn center(&self) -> Option<MapCenter> {
        self.center
    }

    /// Add a layer; later layers draw on top
    pub fn add_layer(&mut self, image: &Image, params: VisParams, name: &str, shown: bool) {
        self.layers.push(Layer {
            name: name.to_string(),
            image: image.visualize(params),
            shown,
        });
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// Materialize every layer into `dir` and write the manifest
    pub fn render(&self, engine: &Engine, dir: &Path, options: &OutputOptions) -> Result<MapManifest> {
        fs::create_dir_all(dir)?;

        let mut projection = String::new();
        let mut entries = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            log::info!("Rendering layer '{}'", layer.name);
            let raster = engine.evaluate(&layer.image)?;
            let file = PathBuf::from(format!("{}.tif", slug(&layer.name)));
            write_rgba(&raster, &dir.join(&file), options)?;

            if projection.is_empty() {
                projection = raster.geo().projection.clone();
            }
            entries.push(LayerEntry {
                name: layer.name.clone(),
                file,
                shown: layer.shown,
            });
        }

        let manifest = MapManifest {
            center: self.center,
            projection,
            layers: entries,
        };
        let manifest_path = dir.join(MANIFEST_FILE);
        let text = serde_json::to_string_pretty(&manifest).map_err(|source| FloodError::Json {
            path: manifest_path.clone(),
            source,
        })?;
        fs::write(&manifest_path, text)?;
        log::info!("Wrote map manifest to {}", manifest_path.display());

        Ok(manifest)
    }
}

/// File-name form of a layer name: "Flooded Area" -> "flooded_area"
fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_file_safe() {
        assert_eq!(slug("Flooded Area"), "flooded_area");
        assert_eq!(slug("False Color (pre)"), "false_color__pre_");
    }
}
