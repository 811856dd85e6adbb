use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::consts::TIDE_PHASE_SAMPLE_SPACING_HOURS;
use crate::error::Result;
use crate::tide::model::{InterpolatedConstituent, TideModel};
use crate::tile::GeoPoint;

/// Tide phase over a capture window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TidePhase {
    Incoming,
    Outgoing,
    PeakHigh,
    PeakLow,
}

impl std::fmt::Display for TidePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incoming => write!(f, "incoming tide"),
            Self::Outgoing => write!(f, "outgoing tide"),
            Self::PeakHigh => write!(f, "peak high tide"),
            Self::PeakLow => write!(f, "peak low tide"),
        }
    }
}

/// Reference epoch for harmonic synthesis: 1992-01-01T00:00:00Z, the
/// datum the constituent phase lags are expressed against.
pub fn model_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1992, 1, 1, 0, 0, 0)
        .single()
        .expect("epoch is a valid UTC timestamp")
}

/// Predict the sea-surface height at `point` and `timestamp`, in metres
/// relative to mean sea level.
///
/// Pure harmonic synthesis over the model constituents; deterministic
/// and safe to call concurrently. Fails with `OutOfCoverage` when the
/// point is outside the model grid.
pub fn predict(model: &TideModel, point: GeoPoint, timestamp: DateTime<Utc>) -> Result<f64> {
    let constants = model.interpolate(point)?;
    Ok(synthesize(&constants, timestamp))
}

/// Predict the height at the capture time and classify the tide phase
/// from samples two hours either side of it.
pub fn predict_with_phase(
    model: &TideModel,
    point: GeoPoint,
    timestamp: DateTime<Utc>,
) -> Result<(f64, TidePhase)> {
    let constants = model.interpolate(point)?;
    let spacing = Duration::hours(TIDE_PHASE_SAMPLE_SPACING_HOURS);
    let before = synthesize(&constants, timestamp - spacing);
    let height = synthesize(&constants, timestamp);
    let after = synthesize(&constants, timestamp + spacing);
    Ok((height, classify_phase(before, height, after)))
}

fn synthesize(constants: &[InterpolatedConstituent], timestamp: DateTime<Utc>) -> f64 {
    let elapsed = timestamp - model_epoch();
    let hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;
    constants
        .iter()
        .map(|c| {
            let angle_deg = c.speed_deg_per_hour * hours - c.phase_deg;
            c.amplitude * angle_deg.to_radians().cos()
        })
        .sum()
}

/// Classify the tide phase from three heights sampled around the
/// capture time.
pub fn classify_phase(before: f64, at: f64, after: f64) -> TidePhase {
    if before > at && at > after {
        TidePhase::Outgoing
    } else if before < at && at > after {
        TidePhase::PeakHigh
    } else if before < at && at < after {
        TidePhase::Incoming
    } else if before > at && at < after {
        TidePhase::PeakLow
    } else if after > before {
        // Flat samples; fall back to the overall trend.
        TidePhase::Incoming
    } else {
        TidePhase::Outgoing
    }
}
