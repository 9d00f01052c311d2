// src/processing/mod.rs
pub mod engine;
pub mod image;
pub mod indices;
pub mod ops;
pub mod raster;

// Re-export main components
pub use engine::{Engine, SceneSelection};
pub use image::{Collection, Image, MetadataFilter};
pub use raster::{Band, Raster};
