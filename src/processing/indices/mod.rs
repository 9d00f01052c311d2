pub mod mndwi;
pub mod ndi;
pub mod ndwi;

// Re-export indices
pub use mndwi::MNDWI;
pub use ndi::NDI;
pub use ndwi::NDWI;

use crate::error::Result;
use crate::processing::{Band, Raster};

/// Trait for spectral index calculators
pub trait IndexCalculator: Send + Sync {
    /// Calculate the index from the named bands of a materialized image
    fn calculate(&self, image: &Raster) -> Result<Band>;

    /// Names of the bands the index reads
    fn required_bands(&self) -> Vec<&str>;

    /// Name of the output band
    fn name(&self) -> &str;
}
