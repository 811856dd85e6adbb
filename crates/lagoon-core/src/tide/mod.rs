pub mod model;
pub mod predict;
pub mod select;

pub use model::TideModel;
pub use predict::{predict, predict_with_phase, TidePhase};
pub use select::{select_by_tide, TideWindow};
