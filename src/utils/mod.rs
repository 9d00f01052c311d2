pub mod cache;
pub mod fixed_point;
