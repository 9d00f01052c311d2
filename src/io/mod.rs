// src/io/mod.rs
pub mod reader;
pub mod vector;
pub mod writer;

pub use reader::{read_band, GeoInfo, ParallelSceneReader};
pub use vector::read_study_area;
pub use writer::{write_band, write_rgba, OutputOptions};
