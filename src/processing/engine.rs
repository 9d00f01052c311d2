// src/processing/engine.rs
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::image::{Collection, CollectionNode, Image, ImageNode};
use super::ops::{self, BinaryOp, MeanAccumulator};
use super::raster::{Band, Raster};
use crate::catalog::{Catalog, CollectionMeta, SceneMeta};
use crate::error::{FloodError, Result};
use crate::io::reader::{BandReadRequest, ParallelSceneReader};
use crate::render;
use crate::utils::cache::RasterCache;

/// Scenes of a collection that survived its filters
#[derive(Debug, Clone)]
pub struct SceneSelection {
    pub collection: String,
    pub meta: CollectionMeta,
    /// Bands to composite, a subset of `meta.bands`
    pub bands: Vec<String>,
    pub scenes: Vec<SceneMeta>,
}

/// Materializes image graphs against a catalog.
///
/// Each node is computed at most once per engine; handles that share a
/// sub-graph reuse its result.
pub struct Engine {
    catalog: Catalog,
    cache: Arc<RasterCache>,
    reader: ParallelSceneReader,
    memo: Mutex<HashMap<usize, (Image, Arc<Raster>)>>,
}

impl Engine {
    pub fn new(catalog: Catalog, io_threads: Option<usize>) -> Self {
        let cache = Arc::new(RasterCache::new());
        let reader = ParallelSceneReader::new(io_threads, Arc::clone(&cache));
        Self {
            catalog,
            cache,
            reader,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Number of band files currently held open
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Drop open datasets and memoized results
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.memo.lock().clear();
    }

    /// Compute an image, reusing any earlier result for the same node
    pub fn evaluate(&self, image: &Image) -> Result<Arc<Raster>> {
        let key = image.key();
        if let Some((_, raster)) = self.memo.lock().get(&key) {
            return Ok(Arc::clone(raster));
        }

        let raster = self.compute(image)?;
        self.memo
            .lock()
            .insert(key, (image.clone(), Arc::clone(&raster)));
        Ok(raster)
    }

    /// Apply a collection's filters to its scene listing
    pub fn select_scenes(&self, collection: &Collection) -> Result<SceneSelection> {
        match collection.node.as_ref() {
            CollectionNode::Load(id) => {
                let loaded = self.catalog.load_collection(id)?;
                Ok(SceneSelection {
                    collection: loaded.id,
                    bands: loaded.meta.bands.clone(),
                    meta: loaded.meta,
                    scenes: loaded.scenes,
                })
            }
            CollectionNode::FilterBounds(input, area) => {
                let mut selection = self.select_scenes(input)?;
                let grid = selection.meta.grid.clone();
                selection
                    .scenes
                    .retain(|scene| area.intersects(&scene.footprint_polygon(&grid)));
                Ok(selection)
            }
            CollectionNode::FilterDate(input, window) => {
                let mut selection = self.select_scenes(input)?;
                selection.scenes.retain(|scene| window.contains(scene.date));
                Ok(selection)
            }
            CollectionNode::Filter(input, filter) => {
                let mut selection = self.select_scenes(input)?;
                selection
                    .scenes
                    .retain(|scene| filter.matches(scene.property(&filter.property)));
                Ok(selection)
            }
            CollectionNode::Select(input, bands) => {
                let mut selection = self.select_scenes(input)?;
                if let Some(missing) = bands.iter().find(|b| !selection.meta.bands.contains(b)) {
                    return Err(FloodError::MissingBand {
                        band: missing.clone(),
                        available: selection.meta.bands.join(", "),
                    });
                }
                selection.bands = bands.clone();
                Ok(selection)
            }
        }
    }

    fn compute(&self, image: &Image) -> Result<Arc<Raster>> {
        let raster = match image.node.as_ref() {
            ImageNode::Source(raster) => return Ok(Arc::clone(raster)),
            ImageNode::Mean(collection) => self.mean_composite(collection)?,
            ImageNode::Select(input, names) => {
                let input = self.evaluate(input)?;
                let bands = names
                    .iter()
                    .map(|n| input.band(n).cloned())
                    .collect::<Result<Vec<_>>>()?;
                Raster::new(input.geo().clone(), bands)?
            }
            ImageNode::Rename(input, names) => {
                let input = self.evaluate(input)?;
                if names.len() != input.bands().len() {
                    return Err(FloodError::InvalidConfig(format!(
                        "rename needs {} names, got {}",
                        input.bands().len(),
                        names.len()
                    )));
                }
                let bands = input
                    .bands()
                    .iter()
                    .zip(names)
                    .map(|(b, n)| b.clone().renamed(n))
                    .collect();
                Raster::new(input.geo().clone(), bands)?
            }
            ImageNode::Index(input, calculator) => {
                let input = self.evaluate(input)?;
                let band = calculator.calculate(&input)?;
                Raster::new(input.geo().clone(), vec![band])?
            }
            ImageNode::Compare(input, op, value) => {
                let input = self.evaluate(input)?;
                let bands = input
                    .bands()
                    .iter()
                    .map(|b| ops::compare(b, *op, *value))
                    .collect();
                Raster::new(input.geo().clone(), bands)?
            }
            ImageNode::Binary(lhs, rhs, op) => {
                let (lhs, rhs) = (self.evaluate(lhs)?, self.evaluate(rhs)?);
                let bands = paired(&lhs, &rhs, |a, b| ops::binary(a, b, *op), binary_name(*op))?;
                Raster::new(lhs.geo().clone(), bands)?
            }
            ImageNode::Remap(input, from, to) => {
                let input = self.evaluate(input)?;
                let band = ops::remap(input.first()?, from, to)?.renamed("remapped");
                Raster::new(input.geo().clone(), vec![band])?
            }
            ImageNode::UpdateMask(input, mask) => {
                let (input, mask) = (self.evaluate(input)?, self.evaluate(mask)?);
                let bands = paired(&input, &mask, ops::update_mask, "update_mask")?;
                Raster::new(input.geo().clone(), bands)?
            }
            ImageNode::Clip(input, area) => {
                let input = self.evaluate(input)?;
                let keep = area.pixel_mask(input.geo());
                let bands = input
                    .bands()
                    .iter()
                    .map(|b| ops::apply_mask(b, &keep))
                    .collect();
                Raster::new(input.geo().clone(), bands)?
            }
            ImageNode::Visualize(input, params) => {
                let input = self.evaluate(input)?;
                render::visualize(&input, params)?
            }
        };
        Ok(Arc::new(raster))
    }

    fn mean_composite(&self, collection: &Collection) -> Result<Raster> {
        let selection = self.select_scenes(collection)?;
        let grid = &selection.meta.grid;

        if selection.scenes.is_empty() {
            log::warn!(
                "No scenes of {} pass {:?}; composite is fully masked",
                selection.collection,
                collection
            );
            let bands = selection
                .bands
                .iter()
                .map(|name| Band::masked(name, grid.width, grid.height))
                .collect();
            return Raster::new(grid.clone(), bands);
        }

        log::info!(
            "Compositing {} of {} scenes of {}: {}",
            selection.bands.join(","),
            selection.scenes.len(),
            selection.collection,
            selection
                .scenes
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let shared_grid = Arc::new(grid.clone());
        let mut requests = Vec::with_capacity(selection.scenes.len() * selection.bands.len());
        for (scene_idx, scene) in selection.scenes.iter().enumerate() {
            for (band_idx, band) in selection.bands.iter().enumerate() {
                requests.push(BandReadRequest {
                    scene_idx,
                    band_idx,
                    band: band.clone(),
                    path: scene.band_path(band)?,
                    grid: Arc::clone(&shared_grid),
                });
            }
        }

        // Each band is folded into its running mean and dropped on arrival
        let mut sums: Vec<MeanAccumulator> = selection
            .bands
            .iter()
            .map(|_| MeanAccumulator::new(grid.width, grid.height))
            .collect();
        self.reader
            .read_each(requests, |request, band| sums[request.band_idx].add(&band))?;

        let bands = sums
            .into_iter()
            .zip(&selection.bands)
            .map(|(acc, name)| acc.finish(name))
            .collect();
        Raster::new(grid.clone(), bands)
    }
}

fn binary_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Subtract => "subtract",
    }
}

/// Pair bands of two images on the same grid; a single-band right-hand
/// image applies to every left-hand band.
fn paired<F>(lhs: &Raster, rhs: &Raster, f: F, what: &str) -> Result<Vec<Band>>
where
    F: Fn(&Band, &Band) -> Result<Band>,
{
    if !lhs.geo().same_grid(rhs.geo()) {
        return Err(FloodError::GridMismatch(format!(
            "{}: {}x{} vs {}x{}",
            what,
            lhs.geo().width,
            lhs.geo().height,
            rhs.geo().width,
            rhs.geo().height
        )));
    }
    match (lhs.bands().len(), rhs.bands().len()) {
        (_, 1) => lhs.bands().iter().map(|a| f(a, &rhs.bands()[0])).collect(),
        (n, m) if n == m => lhs
            .bands()
            .iter()
            .zip(rhs.bands())
            .map(|(a, b)| f(a, b))
            .collect(),
        (n, m) => Err(FloodError::GridMismatch(format!(
            "{}: {} bands vs {} bands",
            what, n, m
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::GeoInfo;

    fn grid(width: usize, height: usize) -> GeoInfo {
        GeoInfo {
            projection: String::new(),
            geo_transform: [0.0, 1.0, 0.0, 0.0, 0.0, -1.0],
            width,
            height,
        }
    }

    fn single(name: &str, values: &[f32]) -> Image {
        let band = Band::from_values(name, values.len(), 1, values.to_vec());
        Image::from_raster(Raster::new(grid(values.len(), 1), vec![band]).unwrap())
    }

    fn engine() -> Engine {
        Engine::new(Catalog::new("/nonexistent"), Some(1))
    }

    #[test]
    fn evaluates_band_math() {
        let a = single("a", &[1.0, 2.0, 3.0]);
        let b = single("b", &[1.0, 1.0, 1.0]);
        let out = engine().evaluate(&a.add(&b).gt(2.5)).unwrap();
        assert_eq!(out.first().unwrap().values(), &[0.0, 1.0, 1.0]);
        assert_eq!(out.band_names(), vec!["a"]);
    }

    #[test]
    fn memoizes_shared_nodes() {
        let engine = engine();
        let image = single("a", &[1.0]).gt(0.0);
        let first = engine.evaluate(&image).unwrap();
        let second = engine.evaluate(&image.clone()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn binary_rejects_different_grids() {
        let a = single("a", &[1.0, 2.0]);
        let b = single("b", &[1.0]);
        assert!(matches!(
            engine().evaluate(&a.subtract(&b)),
            Err(FloodError::GridMismatch(_))
        ));
    }

    #[test]
    fn missing_band_fails_at_evaluation() {
        let image = single("B3", &[0.2]).normalized_difference("B3", "B8");
        assert!(matches!(
            engine().evaluate(&image),
            Err(FloodError::MissingBand { .. })
        ));
    }

    #[test]
    fn rename_and_select() {
        let image = single("remapped", &[1.0]).rename(&["confidence"]);
        let out = engine().evaluate(&image.select(&["confidence"])).unwrap();
        assert_eq!(out.band_names(), vec!["confidence"]);
        assert!(engine().evaluate(&image.rename(&["a", "b"])).is_err());
    }

    #[test]
    fn collection_select_rejects_unknown_band() {
        let dir = tempfile::tempdir().unwrap();
        let collection_dir = dir.path().join("S2");
        std::fs::create_dir_all(&collection_dir).unwrap();
        std::fs::write(
            collection_dir.join("collection.json"),
            r#"{"bands": ["B3", "B8"], "grid": {"geo_transform": [0, 10, 0, 0, 0, -10], "width": 2, "height": 1}}"#,
        )
        .unwrap();
        let engine = Engine::new(Catalog::new(dir.path()), Some(1));

        let selected = engine.select_scenes(&Collection::load("S2").select(&["B8"])).unwrap();
        assert_eq!(selected.bands, vec!["B8"]);

        let empty = engine.evaluate(&Collection::load("S2").select(&["B8"]).mean()).unwrap();
        assert_eq!(empty.band_names(), vec!["B8"]);
        assert_eq!(empty.first().unwrap().valid_count(), 0);

        assert!(matches!(
            engine.select_scenes(&Collection::load("S2").select(&["B11"])),
            Err(FloodError::MissingBand { .. })
        ));
    }

    #[test]
    fn unknown_collection_is_an_error() {
        let image = Collection::load("COPERNICUS/S2_SR_HARMONIZED").mean();
        assert!(matches!(
            engine().evaluate(&image),
            Err(FloodError::CollectionNotFound(_))
        ));
    }
}
