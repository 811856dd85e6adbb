pub mod percentile;

pub use percentile::{median_scene, percentile_composite, percentile_scene};
