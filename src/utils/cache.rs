use gdal::Dataset;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

/// Default number of datasets held open at once
pub const MAX_OPEN_DATASETS: usize = 64;

#[derive(Default)]
struct Entries {
    datasets: HashMap<PathBuf, Arc<Mutex<Dataset>>>,
    order: VecDeque<PathBuf>,
}

/// Thread-safe cache of opened GDAL datasets, keyed by path.
///
/// Holds at most `capacity` datasets; the oldest one is closed when a new
/// file is opened past that. A reader still holding an evicted dataset
/// keeps it alive until it is done.
pub struct RasterCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl Default for RasterCache {
    fn default() -> Self {
        Self::with_capacity(MAX_OPEN_DATASETS)
    }
}

impl RasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn get_dataset<P: AsRef<Path>>(&self, path: P) -> Result<Arc<Mutex<Dataset>>> {
        let path_buf = path.as_ref().to_path_buf();

        let mut cache = self.entries.lock();
        if let Some(dataset) = cache.datasets.get(&path_buf) {
            return Ok(Arc::clone(dataset));
        }

        // Not in cache, open and add it
        let dataset = Arc::new(Mutex::new(Dataset::open(path.as_ref())?));
        while cache.order.len() >= self.capacity {
            if let Some(oldest) = cache.order.pop_front() {
                cache.datasets.remove(&oldest);
            }
        }
        cache.order.push_back(path_buf.clone());
        cache.datasets.insert(path_buf, Arc::clone(&dataset));

        Ok(dataset)
    }

    pub fn clear(&self) {
        let mut cache = self.entries.lock();
        cache.datasets.clear();
        cache.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
