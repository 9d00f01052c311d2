// tests/pipeline_tests.rs
use gdal::raster::Buffer;
use gdal::DriverManager;
use std::fs;
use std::path::Path;

use flood_extent::catalog::Catalog;
use flood_extent::config::{DateWindow, FloodConfig};
use flood_extent::flood::{FloodPipeline, FLOOD_MASK_FILE};
use flood_extent::io::reader::open_band;
use flood_extent::io::{GeoInfo, OutputOptions};
use flood_extent::processing::{Collection, Engine};

const SIZE: usize = 4;
const GEO_TRANSFORM: [f64; 6] = [0.0, 10.0, 0.0, 40.0, 0.0, -10.0];

const WATER: [f32; 3] = [0.4, 0.1, 0.1];
const LAND: [f32; 3] = [0.1, 0.3, 0.3];
const CLOUD: [f32; 3] = [0.9, 0.9, 0.9];

fn grid() -> GeoInfo {
    GeoInfo {
        projection: String::new(),
        geo_transform: GEO_TRANSFORM,
        width: SIZE,
        height: SIZE,
    }
}

fn write_tif(path: &Path, values: Vec<f32>, nodata: Option<f64>) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<f32, _>(path, SIZE, SIZE, 1)
        .unwrap();
    dataset.set_geo_transform(&GEO_TRANSFORM).unwrap();
    let mut band = dataset.rasterband(1).unwrap();
    if nodata.is_some() {
        band.set_no_data_value(nodata).unwrap();
    }
    let mut buffer = Buffer::new((SIZE, SIZE), values);
    band.write((0, 0), (SIZE, SIZE), &mut buffer).unwrap();
}

/// Write one scene; `pixel` gives the (green, nir, swir) sample of a column
fn write_scene(root: &Path, id: &str, date: &str, cloud: f64, footprint: Option<&str>, pixel: impl Fn(usize) -> [f32; 3]) {
    let dir = root.join("S2").join(id);
    fs::create_dir_all(&dir).unwrap();

    for (idx, band) in ["B3", "B8", "B11"].iter().enumerate() {
        let values = (0..SIZE * SIZE).map(|i| pixel(i % SIZE)[idx]).collect();
        write_tif(&dir.join(format!("{}.tif", band)), values, None);
    }

    let footprint = footprint.map(|f| format!(r#", "footprint": {}"#, f)).unwrap_or_default();
    let scene = format!(
        r#"{{"id": "{id}", "date": "{date}", "properties": {{"CLOUDY_PIXEL_PERCENTAGE": {cloud}}},
            "bands": {{"B3": "B3.tif", "B8": "B8.tif", "B11": "B11.tif"}}{footprint}}}"#
    );
    fs::write(dir.join("scene.json"), scene).unwrap();
}

/// Catalog over a 4x4 grid: land everywhere before the event, the two
/// western columns under water after it. The study area is the northern
/// half of the grid.
fn build_catalog(root: &Path) {
    let area_dir = root.join("users/test");
    fs::create_dir_all(&area_dir).unwrap();
    fs::write(
        area_dir.join("area.geojson"),
        r#"{"type": "FeatureCollection", "features": [{"type": "Feature", "properties": {},
            "geometry": {"type": "Polygon", "coordinates": [[[0, 20], [40, 20], [40, 40], [0, 40], [0, 20]]]}}]}"#,
    )
    .unwrap();

    fs::create_dir_all(root.join("S2")).unwrap();
    let collection = serde_json::json!({ "bands": ["B3", "B8", "B11"], "grid": grid() });
    fs::write(root.join("S2/collection.json"), collection.to_string()).unwrap();

    write_scene(root, "pre_a", "2022-01-05", 3.0, None, |_| LAND);
    write_scene(root, "pre_b", "2022-01-20", 12.0, None, |_| LAND);
    // Outside both windows
    write_scene(root, "may", "2022-05-01", 1.0, None, |_| WATER);
    write_scene(root, "post_a", "2022-09-10", 5.0, None, |col| if col < 2 { WATER } else { LAND });
    // Too cloudy
    write_scene(root, "post_cloudy", "2022-09-12", 80.0, None, |_| CLOUD);
    // Footprint far from the study area
    write_scene(
        root,
        "post_elsewhere",
        "2022-09-15",
        1.0,
        Some("[[1000, 1000], [1100, 1000], [1100, 1100], [1000, 1100]]"),
        |_| CLOUD,
    );
}

fn config() -> FloodConfig {
    FloodConfig {
        study_area: "users/test/area".to_string(),
        collection: "S2".to_string(),
        ..FloodConfig::default()
    }
}

#[test]
fn detects_new_water_end_to_end() {
    let catalog_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    build_catalog(catalog_dir.path());

    let catalog = Catalog::new(catalog_dir.path());
    let area = catalog.load_study_area("users/test/area").unwrap();
    let engine = Engine::new(catalog, Some(2));
    let pipeline = FloodPipeline::new(config(), area);

    let (stats, manifest) = pipeline
        .run(&engine, out_dir.path(), &OutputOptions::default())
        .unwrap();

    assert_eq!(stats.valid_pixels, 8);
    assert_eq!(stats.flooded_pixels, 4);
    assert!((stats.flooded_area - 400.0).abs() < 1e-9);

    // Southern rows lie outside the study area: nodata, not zero
    let mask = open_band(&out_dir.path().join(FLOOD_MASK_FILE), "flooded", &grid()).unwrap();
    for row in 0..SIZE {
        for col in 0..SIZE {
            let expected = if col < 2 && row < 2 { Some(1.0) } else { None };
            assert_eq!(mask.get(row * SIZE + col), expected, "pixel ({}, {})", col, row);
        }
    }
    let post = engine.evaluate(pipeline.post_composite()).unwrap();
    let green = post.band("B3").unwrap();
    assert_eq!(green.valid_count(), 8);
    assert_eq!(green.get(3 * SIZE), None);
    assert!(green.get(0).is_some());

    let names: Vec<&str> = manifest.layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Pre-Flood False Color", "Post-Flood False Color", "Flooded Area"]);
    assert_eq!(manifest.layers.iter().filter(|l| l.shown).count(), 1);
    for layer in &manifest.layers {
        assert!(out_dir.path().join(&layer.file).is_file());
    }
    assert!(out_dir.path().join("map.json").is_file());
    assert_eq!(manifest.center.map(|c| (c.x, c.y, c.zoom)), Some((20.0, 30.0, 6.5)));

    // Scene files are opened once and shared between composites
    assert_eq!(engine.cache_size(), 9);
    engine.clear_cache();
    assert_eq!(engine.cache_size(), 0);
}

#[test]
fn empty_window_masks_everything() {
    let catalog_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    build_catalog(catalog_dir.path());

    let catalog = Catalog::new(catalog_dir.path());
    let area = catalog.load_study_area("users/test/area").unwrap();
    let engine = Engine::new(catalog, Some(1));
    let config = FloodConfig {
        pre_flood: DateWindow::parse("2021-01-01", "2021-01-30").unwrap(),
        ..config()
    };
    let pipeline = FloodPipeline::new(config, area);

    let pre = engine.evaluate(pipeline.pre_composite()).unwrap();
    assert_eq!(pre.band_names(), vec!["B3", "B8", "B11"]);
    assert!(pre.bands().iter().all(|b| b.valid_count() == 0));

    let (stats, _) = pipeline
        .run(&engine, out_dir.path(), &OutputOptions::default())
        .unwrap();
    assert_eq!(stats.valid_pixels, 0);
    assert_eq!(stats.flooded_pixels, 0);

    let mask = open_band(&out_dir.path().join(FLOOD_MASK_FILE), "flooded", &grid()).unwrap();
    assert_eq!(mask.valid_count(), 0);
}

/// One band per scene, written with the given nodata value
fn write_nodata_scene(root: &Path, id: &str, values: Vec<f32>, nodata: f64) {
    let dir = root.join("NODATA").join(id);
    fs::create_dir_all(&dir).unwrap();
    write_tif(&dir.join("B3.tif"), values, Some(nodata));
    fs::write(
        dir.join("scene.json"),
        format!(r#"{{"id": "{id}", "date": "2022-09-10", "bands": {{"B3": "B3.tif"}}}}"#),
    )
    .unwrap();
}

#[test]
fn nodata_values_mask_only_their_samples() {
    let catalog_dir = tempfile::tempdir().unwrap();
    let root = catalog_dir.path();
    fs::create_dir_all(root.join("NODATA")).unwrap();
    let collection = serde_json::json!({ "bands": ["B3"], "grid": grid() });
    fs::write(root.join("NODATA/collection.json"), collection.to_string()).unwrap();

    // Column 0 is NaN in one scene, column 1 is zero in the other
    let nan_values = (0..SIZE * SIZE).map(|i| if i % SIZE == 0 { f32::NAN } else { 0.4 }).collect();
    let zero_values = (0..SIZE * SIZE).map(|i| if i % SIZE == 1 { 0.0 } else { 0.2 }).collect();
    write_nodata_scene(root, "nan", nan_values, f64::NAN);
    write_nodata_scene(root, "zero", zero_values, 0.0);

    let nan_band = open_band(&root.join("NODATA/nan/B3.tif"), "B3", &grid()).unwrap();
    assert_eq!(nan_band.valid_count(), 12);
    let zero_band = open_band(&root.join("NODATA/zero/B3.tif"), "B3", &grid()).unwrap();
    assert_eq!(zero_band.valid_count(), 12);

    let engine = Engine::new(Catalog::new(root), Some(2));
    let composite = engine.evaluate(&Collection::load("NODATA").mean()).unwrap();
    let green = composite.first().unwrap();
    assert_eq!(green.valid_count(), 16);
    assert!((green.get(0).unwrap() - 0.2).abs() < 1e-6);
    assert!((green.get(1).unwrap() - 0.4).abs() < 1e-6);
    assert!((green.get(2).unwrap() - 0.3).abs() < 1e-6);
}

#[test]
fn missing_study_area_fails() {
    let catalog_dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::new(catalog_dir.path());
    assert!(catalog.load_study_area("users/adewaleolayemi004/sindh").is_err());
}
