// src/catalog.rs
//! File-backed catalog of vector assets and image collections.
//!
//! ```text
//! <root>/<asset id>.geojson                  vector assets
//! <root>/<collection id>/collection.json     bands + grid
//! <root>/<collection id>/<scene>/scene.json  date, properties, band files
//! ```

use chrono::NaiveDate;
use geo::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FloodError, Result};
use crate::geometry::StudyArea;
use crate::io::{read_study_area, GeoInfo};

const VECTOR_EXTENSIONS: [&str; 4] = ["geojson", "json", "gpkg", "shp"];
const COLLECTION_FILE: &str = "collection.json";
const SCENE_FILE: &str = "scene.json";

/// `collection.json`: the bands every scene provides and their common grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub bands: Vec<String>,
    pub grid: GeoInfo,
}

/// `scene.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMeta {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Band name to file name, relative to the scene directory
    pub bands: BTreeMap<String, String>,
    /// Valid-data outline as a ring of map coordinates; the grid extent
    /// when absent
    #[serde(default)]
    pub footprint: Option<Vec<[f64; 2]>>,
    #[serde(skip)]
    pub dir: PathBuf,
}

impl SceneMeta {
    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).and_then(serde_json::Value::as_f64)
    }

    pub fn footprint_polygon(&self, grid: &GeoInfo) -> Polygon<f64> {
        match &self.footprint {
            Some(ring) if ring.len() >= 3 => {
                let coords: Vec<Coord<f64>> = ring.iter().map(|&[x, y]| Coord { x, y }).collect();
                Polygon::new(LineString::from(coords), vec![])
            }
            _ => grid.extent().to_polygon(),
        }
    }

    pub fn band_path(&self, band: &str) -> Result<PathBuf> {
        self.bands
            .get(band)
            .map(|file| self.dir.join(file))
            .ok_or_else(|| FloodError::MissingBand {
                band: band.to_string(),
                available: self.bands.keys().cloned().collect::<Vec<_>>().join(", "),
            })
    }
}

/// A collection with its scene listing, before any filtering
#[derive(Debug, Clone)]
pub struct LoadedCollection {
    pub id: String,
    pub meta: CollectionMeta,
    pub scenes: Vec<SceneMeta>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate a vector asset by id, trying the known vector extensions
    pub fn asset_path(&self, id: &str) -> Result<PathBuf> {
        let base = self.root.join(id);
        if base.is_file() {
            return Ok(base);
        }
        VECTOR_EXTENSIONS
            .iter()
            .map(|ext| base.with_extension(ext))
            .find(|p| p.is_file())
            .ok_or_else(|| FloodError::AssetNotFound(id.to_string()))
    }

    pub fn load_study_area(&self, id: &str) -> Result<StudyArea> {
        let path = self.asset_path(id)?;
        read_study_area(&path, id)
    }

    pub fn load_collection(&self, id: &str) -> Result<LoadedCollection> {
        let dir = self.root.join(id);
        let meta_path = dir.join(COLLECTION_FILE);
        if !meta_path.is_file() {
            return Err(FloodError::CollectionNotFound(id.to_string()));
        }
        let meta: CollectionMeta = read_json(&meta_path)?;

        let mut scenes = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let scene_dir = entry?.path();
            let scene_path = scene_dir.join(SCENE_FILE);
            if !scene_path.is_file() {
                continue;
            }
            let mut scene: SceneMeta = read_json(&scene_path)?;
            scene.dir = scene_dir;
            scenes.push(scene);
        }
        // Directory order is platform dependent
        scenes.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        log::debug!("Collection {} lists {} scenes", id, scenes.len());
        Ok(LoadedCollection {
            id: id.to_string(),
            meta,
            scenes,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| FloodError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn loads_scenes_sorted_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("S2/collection.json"),
            r#"{"bands": ["B3"], "grid": {"geo_transform": [0, 10, 0, 0, 0, -10], "width": 2, "height": 2}}"#,
        );
        write(
            &root.join("S2/b/scene.json"),
            r#"{"id": "b", "date": "2022-09-10", "properties": {"CLOUDY_PIXEL_PERCENTAGE": 5}, "bands": {"B3": "B03.tif"}}"#,
        );
        write(
            &root.join("S2/a/scene.json"),
            r#"{"id": "a", "date": "2022-09-02", "bands": {"B3": "B03.tif"}}"#,
        );

        let collection = Catalog::new(root).load_collection("S2").unwrap();
        let ids: Vec<&str> = collection.scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(collection.scenes[1].property("CLOUDY_PIXEL_PERCENTAGE"), Some(5.0));
        assert_eq!(collection.scenes[0].property("CLOUDY_PIXEL_PERCENTAGE"), None);
        assert_eq!(collection.scenes[1].band_path("B3").unwrap(), root.join("S2/b/B03.tif"));
        assert!(collection.scenes[1].band_path("B8").is_err());
    }

    #[test]
    fn missing_collection_and_asset() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(dir.path());
        assert!(matches!(
            catalog.load_collection("COPERNICUS/S2_SR_HARMONIZED"),
            Err(FloodError::CollectionNotFound(_))
        ));
        assert!(matches!(catalog.asset_path("users/x/sindh"), Err(FloodError::AssetNotFound(_))));
    }

    #[test]
    fn footprint_defaults_to_grid_extent() {
        let grid = GeoInfo {
            projection: String::new(),
            geo_transform: [0.0, 10.0, 0.0, 20.0, 0.0, -10.0],
            width: 2,
            height: 2,
        };
        let scene = SceneMeta {
            id: "s".to_string(),
            date: NaiveDate::from_ymd_opt(2022, 1, 5).unwrap(),
            properties: BTreeMap::new(),
            bands: BTreeMap::new(),
            footprint: None,
            dir: PathBuf::new(),
        };
        let poly = scene.footprint_polygon(&grid);
        assert_eq!(poly.exterior().0.len(), 5);
    }
}
