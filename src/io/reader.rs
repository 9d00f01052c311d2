// src/io/reader.rs
use gdal::Dataset;
use geo::{coord, Rect};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};

use crate::error::{FloodError, Result};
use crate::processing::Band;
use crate::utils::cache::RasterCache;

/// Pixel grid shared by every band of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    #[serde(default)]
    pub projection: String,
    pub geo_transform: [f64; 6],
    pub width: usize,
    pub height: usize,
}

impl GeoInfo {
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let (width, height) = dataset.raster_size();
        let gt = dataset.geo_transform()?;
        Ok(Self {
            projection: dataset.projection(),
            geo_transform: [gt[0], gt[1], gt[2], gt[3], gt[4], gt[5]],
            width,
            height,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Map coordinates of the centre of pixel (col, row)
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        let gt = &self.geo_transform;
        let (c, r) = (col as f64 + 0.5, row as f64 + 0.5);
        (gt[0] + c * gt[1] + r * gt[2], gt[3] + c * gt[4] + r * gt[5])
    }

    /// Area of one pixel in squared CRS units
    pub fn pixel_area(&self) -> f64 {
        let gt = &self.geo_transform;
        (gt[1] * gt[5] - gt[2] * gt[4]).abs()
    }

    pub fn extent(&self) -> Rect<f64> {
        let corners = [
            (0.0, 0.0),
            (self.width as f64, 0.0),
            (0.0, self.height as f64),
            (self.width as f64, self.height as f64),
        ];
        let gt = &self.geo_transform;
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (c, r) in corners {
            let x = gt[0] + c * gt[1] + r * gt[2];
            let y = gt[3] + c * gt[4] + r * gt[5];
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y })
    }

    pub fn same_grid(&self, other: &GeoInfo) -> bool {
        self.width == other.width
            && self.height == other.height
            && self
                .geo_transform
                .iter()
                .zip(other.geo_transform.iter())
                .all(|(a, b)| (a - b).abs() < 1e-9)
    }
}

/// Read band 1 of `path` as a named, masked band on the expected grid.
///
/// The band's nodata value and NaN samples become masked pixels.
pub fn read_band(dataset: &Dataset, name: &str, grid: &GeoInfo) -> Result<Band> {
    let info = GeoInfo::from_dataset(dataset)?;
    if !info.same_grid(grid) {
        return Err(FloodError::GridMismatch(format!(
            "band {} is {}x{} {:?}, collection grid is {}x{} {:?}",
            name, info.width, info.height, info.geo_transform, grid.width, grid.height, grid.geo_transform
        )));
    }

    let band = dataset.rasterband(1)?;
    let nodata = band.no_data_value();
    let size = (grid.width, grid.height);
    let buffer = band.read_as::<f32>((0, 0), size, size, None)?;

    let values = buffer.data().to_vec();
    let mask = values.iter().map(|&v| is_valid(v, nodata)).collect();

    Ok(Band::new(name, grid.width, grid.height, values, mask))
}

/// A sample is valid unless it is NaN or equals the band's nodata value.
/// A NaN nodata value only marks NaN samples.
pub(crate) fn is_valid(value: f32, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return false;
    }
    match nodata {
        Some(nd) if !nd.is_nan() => value as f64 != nd && value != nd as f32,
        _ => true,
    }
}

/// One band file of one scene
#[derive(Debug, Clone)]
pub struct BandReadRequest {
    pub scene_idx: usize,
    /// Position of the band in the composite being built
    pub band_idx: usize,
    pub band: String,
    pub path: PathBuf,
    pub grid: Arc<GeoInfo>,
}

type BandReadResult = (BandReadRequest, Result<Band>);
type ReadJob = (BandReadRequest, Sender<BandReadResult>);

/// Worker pool reading scene band files over a channel.
///
/// Datasets are opened through a shared, bounded [`RasterCache`].
pub struct ParallelSceneReader {
    threads: usize,
    workers: Vec<JoinHandle<()>>,
    req_tx: Option<Sender<ReadJob>>,
}

impl ParallelSceneReader {
    pub fn new(io_threads: Option<usize>, cache: Arc<RasterCache>) -> Self {
        let threads = io_threads.unwrap_or_else(|| num_cpus::get().max(4)).max(1);
        let (req_tx, req_rx) = flume::unbounded::<ReadJob>();

        let mut workers = Vec::with_capacity(threads);
        for _ in 0..threads {
            let req_rx: Receiver<ReadJob> = req_rx.clone();
            let cache = Arc::clone(&cache);

            workers.push(thread::spawn(move || {
                for (request, reply) in req_rx {
                    let result = cache.get_dataset(&request.path).and_then(|shared| {
                        let dataset = shared.lock();
                        read_band(&dataset, &request.band, &request.grid)
                    });
                    log::debug!(
                        "Read {} of scene {} from {}",
                        request.band,
                        request.scene_idx,
                        request.path.display()
                    );
                    // The receiver only disappears when the caller gave up
                    let _ = reply.send((request, result));
                }
            }));
        }

        Self {
            threads,
            workers,
            req_tx: Some(req_tx),
        }
    }

    /// Read every requested band, handing each one to `on_band` as soon as
    /// it arrives. Arrival order is unspecified.
    ///
    /// At most a few bands per worker are in flight at once, so memory stays
    /// bounded by the consumer rather than by the number of requests.
    pub fn read_each<F>(&self, requests: Vec<BandReadRequest>, mut on_band: F) -> Result<()>
    where
        F: FnMut(&BandReadRequest, Band) -> Result<()>,
    {
        let req_tx = self
            .req_tx
            .as_ref()
            .ok_or_else(|| FloodError::Reader("reader is shut down".to_string()))?;

        let (tx, rx) = flume::bounded(self.threads * 2);
        let total = requests.len();
        for request in requests {
            req_tx
                .send((request, tx.clone()))
                .map_err(|e| FloodError::Reader(e.to_string()))?;
        }
        drop(tx);

        let mut received = 0;
        for (request, result) in rx {
            on_band(&request, result?)?;
            received += 1;
        }
        if received != total {
            return Err(FloodError::Reader(format!(
                "expected {} band reads, got {}",
                total, received
            )));
        }
        Ok(())
    }
}

impl Drop for ParallelSceneReader {
    fn drop(&mut self) {
        drop(self.req_tx.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Scene reader thread panicked");
            }
        }
    }
}

/// Open a single-band file without going through the cache.
pub fn open_band(path: &Path, name: &str, grid: &GeoInfo) -> Result<Band> {
    let dataset = Dataset::open(path)?;
    read_band(&dataset, name, grid)
}
