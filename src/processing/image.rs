// src/processing/image.rs
//! Lazy image and collection handles.
//!
//! Every operation returns a new handle wrapping a graph node; nothing is
//! read or computed until [`Engine::evaluate`](super::Engine::evaluate)
//! materializes a node. Handles are cheap to clone and share sub-graphs.

use std::fmt;
use std::sync::Arc;

use super::indices::{IndexCalculator, NDI};
use super::ops::{BinaryOp, CompareOp};
use super::raster::Raster;
use crate::config::DateWindow;
use crate::geometry::StudyArea;
use crate::render::VisParams;

/// Scene-level metadata predicate, e.g. `CLOUDY_PIXEL_PERCENTAGE < 20`
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFilter {
    pub property: String,
    pub op: CompareOp,
    pub value: f64,
}

impl MetadataFilter {
    pub fn lt(property: &str, value: f64) -> Self {
        Self {
            property: property.to_string(),
            op: CompareOp::Lt,
            value,
        }
    }

    pub fn gt(property: &str, value: f64) -> Self {
        Self {
            property: property.to_string(),
            op: CompareOp::Gt,
            value,
        }
    }

    /// A missing property never matches
    pub fn matches(&self, actual: Option<f64>) -> bool {
        match actual {
            None => false,
            Some(v) => match self.op {
                CompareOp::Lt => v < self.value,
                CompareOp::Gt => v > self.value,
                CompareOp::Eq => v == self.value,
            },
        }
    }
}

pub(crate) enum CollectionNode {
    Load(String),
    FilterBounds(Collection, Arc<StudyArea>),
    FilterDate(Collection, DateWindow),
    Filter(Collection, MetadataFilter),
    Select(Collection, Vec<String>),
}

/// Handle to a (filtered) image collection
#[derive(Clone)]
pub struct Collection {
    pub(crate) node: Arc<CollectionNode>,
}

impl Collection {
    pub fn load(id: &str) -> Self {
        Self::wrap(CollectionNode::Load(id.to_string()))
    }

    fn wrap(node: CollectionNode) -> Self {
        Self { node: Arc::new(node) }
    }

    /// Keep scenes whose footprint intersects the area
    pub fn filter_bounds(&self, area: &Arc<StudyArea>) -> Self {
        Self::wrap(CollectionNode::FilterBounds(self.clone(), Arc::clone(area)))
    }

    /// Keep scenes acquired inside the half-open window
    pub fn filter_date(&self, window: DateWindow) -> Self {
        Self::wrap(CollectionNode::FilterDate(self.clone(), window))
    }

    pub fn filter(&self, filter: MetadataFilter) -> Self {
        Self::wrap(CollectionNode::Filter(self.clone(), filter))
    }

    /// Restrict scenes to the named bands; only these are read
    pub fn select(&self, bands: &[&str]) -> Self {
        Self::wrap(CollectionNode::Select(self.clone(), to_strings(bands)))
    }

    /// Per-pixel temporal mean over the collection
    pub fn mean(&self) -> Image {
        Image::wrap(ImageNode::Mean(self.clone()))
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node.as_ref() {
            CollectionNode::Load(id) => write!(f, "Collection({})", id),
            CollectionNode::FilterBounds(input, area) => write!(f, "{:?}.filter_bounds({})", input, area.id()),
            CollectionNode::FilterDate(input, window) => write!(f, "{:?}.filter_date({})", input, window),
            CollectionNode::Filter(input, filter) => write!(
                f,
                "{:?}.filter({} {:?} {})",
                input, filter.property, filter.op, filter.value
            ),
            CollectionNode::Select(input, bands) => write!(f, "{:?}.select({:?})", input, bands),
        }
    }
}

pub(crate) enum ImageNode {
    Source(Arc<Raster>),
    Mean(Collection),
    Select(Image, Vec<String>),
    Rename(Image, Vec<String>),
    Index(Image, Arc<dyn IndexCalculator>),
    Compare(Image, CompareOp, f32),
    Binary(Image, Image, BinaryOp),
    Remap(Image, Vec<f32>, Vec<f32>),
    UpdateMask(Image, Image),
    Clip(Image, Arc<StudyArea>),
    Visualize(Image, VisParams),
}

/// Handle to a lazily computed image
#[derive(Clone)]
pub struct Image {
    pub(crate) node: Arc<ImageNode>,
}

impl Image {
    fn wrap(node: ImageNode) -> Self {
        Self { node: Arc::new(node) }
    }

    /// An already materialized image
    pub fn from_raster(raster: Raster) -> Self {
        Self::wrap(ImageNode::Source(Arc::new(raster)))
    }

    pub fn select(&self, bands: &[&str]) -> Self {
        Self::wrap(ImageNode::Select(self.clone(), to_strings(bands)))
    }

    pub fn rename(&self, names: &[&str]) -> Self {
        Self::wrap(ImageNode::Rename(self.clone(), to_strings(names)))
    }

    /// `(a - b) / (a + b)` as a band named `nd`
    pub fn normalized_difference(&self, band_a: &str, band_b: &str) -> Self {
        self.index(Arc::new(NDI::new(band_a, band_b, None)))
    }

    pub fn index(&self, calculator: Arc<dyn IndexCalculator>) -> Self {
        Self::wrap(ImageNode::Index(self.clone(), calculator))
    }

    pub fn gt(&self, value: f32) -> Self {
        Self::wrap(ImageNode::Compare(self.clone(), CompareOp::Gt, value))
    }

    pub fn lt(&self, value: f32) -> Self {
        Self::wrap(ImageNode::Compare(self.clone(), CompareOp::Lt, value))
    }

    pub fn eq(&self, value: f32) -> Self {
        Self::wrap(ImageNode::Compare(self.clone(), CompareOp::Eq, value))
    }

    pub fn add(&self, other: &Image) -> Self {
        Self::wrap(ImageNode::Binary(self.clone(), other.clone(), BinaryOp::Add))
    }

    pub fn subtract(&self, other: &Image) -> Self {
        Self::wrap(ImageNode::Binary(self.clone(), other.clone(), BinaryOp::Subtract))
    }

    /// Remap the first band; values missing from `from` are masked.
    /// The output band is named `remapped`.
    pub fn remap(&self, from: &[f32], to: &[f32]) -> Self {
        Self::wrap(ImageNode::Remap(self.clone(), from.to_vec(), to.to_vec()))
    }

    /// Mask pixels where `mask` is zero or masked
    pub fn update_mask(&self, mask: &Image) -> Self {
        Self::wrap(ImageNode::UpdateMask(self.clone(), mask.clone()))
    }

    /// Mask pixels whose centre falls outside the area
    pub fn clip(&self, area: &Arc<StudyArea>) -> Self {
        Self::wrap(ImageNode::Clip(self.clone(), Arc::clone(area)))
    }

    /// 3-band 0..255 rendering (`vis-red`, `vis-green`, `vis-blue`)
    pub fn visualize(&self, params: VisParams) -> Self {
        Self::wrap(ImageNode::Visualize(self.clone(), params))
    }

    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.node) as *const () as usize
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node.as_ref() {
            ImageNode::Source(r) => write!(f, "Image({})", r.band_names().join(",")),
            ImageNode::Mean(c) => write!(f, "{:?}.mean()", c),
            ImageNode::Select(i, b) => write!(f, "{:?}.select({:?})", i, b),
            ImageNode::Rename(i, b) => write!(f, "{:?}.rename({:?})", i, b),
            ImageNode::Index(i, c) => write!(f, "{:?}.index({})", i, c.name()),
            ImageNode::Compare(i, op, v) => write!(f, "{:?}.{:?}({})", i, op, v),
            ImageNode::Binary(a, b, op) => write!(f, "{:?}.{:?}({:?})", a, op, b),
            ImageNode::Remap(i, from, to) => write!(f, "{:?}.remap({:?}, {:?})", i, from, to),
            ImageNode::UpdateMask(i, m) => write!(f, "{:?}.update_mask({:?})", i, m),
            ImageNode::Clip(i, a) => write!(f, "{:?}.clip({})", i, a.id()),
            ImageNode::Visualize(i, _) => write!(f, "{:?}.visualize()", i),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
