// src/lib.rs
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod flood;
pub mod geometry;
pub mod io;
pub mod processing;
pub mod render;
pub mod utils;

pub use error::{FloodError, Result};
