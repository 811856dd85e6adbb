use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS, MIN_VALID_PIXEL_FRACTION};
use crate::error::{CompositeError, Result};
use crate::filters::sunglint::GlintParams;
use crate::io::catalog::{CandidateOrdering, FilterOptions};
use crate::quality::glint::GlintScreenParams;
use crate::tide::select::TideWindow;
use crate::tile::DateRange;

/// Composite product variant. Each variant fixes which curation stages
/// run; there is no per-stage branching anywhere else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Product {
    /// Cloud-ranked, noise-curated composite of the full band set.
    TrueColour,
    /// Composite of the lowest-tide captures, for intertidal features.
    LowTide {
        /// Maximum predicted tide height, metres relative to mean sea
        /// level.
        tide_height_threshold: f64,
    },
    /// Water-index composite from captures above the tide threshold,
    /// for shoreline extraction.
    Ndwi {
        /// Minimum predicted tide height, metres relative to mean sea
        /// level.
        tide_height_threshold: f64,
    },
}

impl Product {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrueColour => "TrueColour",
            Self::LowTide { .. } => "LowTide",
            Self::Ndwi { .. } => "NDWI",
        }
    }

    pub fn uses_tide(&self) -> bool {
        self.tide_window().is_some()
    }

    pub fn tide_window(&self) -> Option<TideWindow> {
        match self {
            Self::TrueColour => None,
            Self::LowTide {
                tide_height_threshold,
            } => Some(TideWindow::Below {
                max_height: *tide_height_threshold,
            }),
            Self::Ndwi {
                tide_height_threshold,
            } => Some(TideWindow::Above {
                min_height: *tide_height_threshold,
            }),
        }
    }

    /// Tide-curated products take candidates in time order; the rest
    /// want the least cloudy captures first.
    pub fn candidate_ordering(&self) -> CandidateOrdering {
        if self.uses_tide() {
            CandidateOrdering::Chronological
        } else {
            CandidateOrdering::CloudCoverFirst
        }
    }
}

/// Immutable configuration for one composite run, passed into the
/// orchestrator at construction and shared read-only by the workers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    pub product: Product,
    /// Worker pool size; one tile is processed end-to-end per worker.
    pub thread_count: usize,
    pub max_cloud_cover_percent: f32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Percentile of the time stack kept at each pixel (0-100).
    pub percentile: f32,
    /// Size of the base set the noise baseline is computed from, and
    /// the minimum usable collection size.
    pub min_images_in_base: usize,
    pub max_images_in_composite: usize,
    /// Output resolution in metres per pixel.
    pub scale_meters: f32,
    pub correct_sun_glint: bool,
    pub glint: GlintParams,
    /// When set, whole images dominated by sun glint are screened out
    /// before curation.
    pub glint_screen: Option<GlintScreenParams>,
    /// Multiplier applied on load when the catalog serves raw digital
    /// numbers instead of reflectance.
    pub reflectance_scale: Option<f32>,
    pub min_valid_fraction: f32,
    /// Carried through to persisted object keys, e.g. "v2_2015-2024".
    pub version_tag: String,
    pub retry_attempts: usize,
    pub retry_backoff_ms: u64,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            product: Product::TrueColour,
            thread_count: 2,
            max_cloud_cover_percent: 20.0,
            start_date: NaiveDate::from_ymd_opt(2015, 6, 27).expect("valid date"),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 31).expect("valid date"),
            percentile: 15.0,
            min_images_in_base: 30,
            max_images_in_composite: 200,
            scale_meters: 10.0,
            correct_sun_glint: true,
            glint: GlintParams::default(),
            glint_screen: None,
            reflectance_scale: None,
            min_valid_fraction: MIN_VALID_PIXEL_FRACTION,
            version_tag: String::new(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl CompositeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| CompositeError::InvalidConfig(err.to_string()))
    }

    pub fn date_range(&self) -> DateRange {
        DateRange::from_dates(self.start_date, self.end_date)
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            max_cloud_cover_percent: self.max_cloud_cover_percent,
            ordering: self.product.candidate_ordering(),
            reflectance_scale: self.reflectance_scale,
            min_valid_fraction: self.min_valid_fraction,
        }
    }

    /// Reject configurations that cannot produce a valid run. Called
    /// before any tile is dispatched; any error here aborts the whole
    /// run.
    pub fn validate(&self, has_tide_model: bool) -> Result<()> {
        if !(0.0..=100.0).contains(&self.percentile) || self.percentile.is_nan() {
            return Err(CompositeError::InvalidConfig(format!(
                "percentile must be within 0-100, got {}",
                self.percentile
            )));
        }
        if self.thread_count == 0 {
            return Err(CompositeError::InvalidConfig(
                "thread_count must be at least 1".to_string(),
            ));
        }
        if self.max_cloud_cover_percent <= 0.0 {
            return Err(CompositeError::InvalidConfig(format!(
                "max_cloud_cover_percent must be positive, got {}",
                self.max_cloud_cover_percent
            )));
        }
        if self.min_images_in_base == 0 {
            return Err(CompositeError::InvalidConfig(
                "min_images_in_base must be at least 1".to_string(),
            ));
        }
        if self.max_images_in_composite < self.min_images_in_base {
            return Err(CompositeError::InvalidConfig(format!(
                "max_images_in_composite ({}) is below min_images_in_base ({})",
                self.max_images_in_composite, self.min_images_in_base
            )));
        }
        if self.scale_meters <= 0.0 {
            return Err(CompositeError::InvalidConfig(format!(
                "scale_meters must be positive, got {}",
                self.scale_meters
            )));
        }
        if self.start_date > self.end_date {
            return Err(CompositeError::InvalidConfig(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.retry_attempts == 0 {
            return Err(CompositeError::InvalidConfig(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(scale) = self.reflectance_scale {
            if scale <= 0.0 {
                return Err(CompositeError::InvalidConfig(format!(
                    "reflectance_scale must be positive, got {scale}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.min_valid_fraction) {
            return Err(CompositeError::InvalidConfig(format!(
                "min_valid_fraction must be within 0-1, got {}",
                self.min_valid_fraction
            )));
        }
        if self.product.uses_tide() && !has_tide_model {
            return Err(CompositeError::InvalidConfig(format!(
                "product {} requires a tide model",
                self.product.name()
            )));
        }
        Ok(())
    }
}
