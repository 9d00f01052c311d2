pub mod map;
pub mod visualize;

pub use map::{MapCenter, MapManifest, MapView};
pub use visualize::{visualize, Rgb, VisParams, VIS_BANDS};
