/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Scale factor converting Sentinel-2 digital numbers (0-10000) to
/// surface reflectance in [0, 1].
pub const REFLECTANCE_SCALE: f32 = 1.0e-4;

/// Blue band name (Sentinel-2 B2, 490 nm).
pub const BAND_BLUE: &str = "B2";

/// Green band name (Sentinel-2 B3, 560 nm).
pub const BAND_GREEN: &str = "B3";

/// Red band name (Sentinel-2 B4, 665 nm).
pub const BAND_RED: &str = "B4";

/// Near-infrared band name (Sentinel-2 B8, 842 nm).
pub const BAND_NIR: &str = "B8";

/// First shortwave-infrared band name (Sentinel-2 B11, 1610 nm).
pub const BAND_SWIR1: &str = "B11";

/// Second shortwave-infrared band name (Sentinel-2 B12, 2190 nm).
pub const BAND_SWIR2: &str = "B12";

/// Name of the derived normalised-difference water index band.
pub const BAND_NDWI: &str = "NDWI";

/// Reflectance cap for the NIR channel when estimating sun glint. In
/// shallow water the NIR channel picks up benthic reflection, so values
/// above this are not glint.
pub const GLINT_REFERENCE_THRESHOLD: f32 = 0.04;

/// Glint subtraction factor for the blue band.
pub const GLINT_FACTOR_BLUE: f32 = 0.85;

/// Glint subtraction factor for the green band.
pub const GLINT_FACTOR_GREEN: f32 = 0.90;

/// Glint subtraction factor for the red band.
pub const GLINT_FACTOR_RED: f32 = 0.95;

/// NIR reflectance above which a water pixel counts as glint-affected
/// when screening whole images.
pub const GLINT_SCREEN_NIR_THRESHOLD: f32 = 0.1;

/// Mean SWIR reflectance above which a water pixel counts as
/// glint-affected when screening whole images.
pub const GLINT_SCREEN_SWIR_THRESHOLD: f32 = 0.05;

/// Maximum tolerated fraction of glint-affected water pixels per image.
pub const GLINT_SCREEN_MAX_PROPORTION: f64 = 0.2;

/// Minimum fraction of valid (unmasked) pixels for a capture to count as
/// a usable scene rather than a tile fragment.
pub const MIN_VALID_PIXEL_FRACTION: f32 = 0.05;

/// Default number of attempts for transient catalog/storage failures.
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

/// Default base delay between retry attempts, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 2_000;

/// Spacing of the tide samples taken around a capture time to classify
/// the tide phase, in hours.
pub const TIDE_PHASE_SAMPLE_SPACING_HOURS: i64 = 2;
