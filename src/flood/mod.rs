//! Two-date flood detection on top of the image graph.

pub mod change;
pub mod composite;
pub mod confidence;
pub mod pipeline;

pub use change::{detect_flooding, FLOODED_BAND};
pub use composite::{build_composite, scenes_for};
pub use confidence::{calculate_confidence, water_indices, CONFIDENCE_BAND};
pub use pipeline::{FloodPipeline, FloodStats, FLOOD_MASK_FILE};
