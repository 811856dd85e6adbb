pub mod ndwi;
pub mod sunglint;

pub use ndwi::{ndwi, water_mask, with_ndwi_band};
pub use sunglint::{correct_collection, correct_sun_glint, GlintParams};
