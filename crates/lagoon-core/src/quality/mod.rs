pub mod glint;
pub mod noise;

pub use glint::{glint_proportion, screen_high_glint, GlintScreenParams};
pub use noise::{curate_by_noise, noise_score};
