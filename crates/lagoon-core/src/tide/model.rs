use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CompositeError, Result};
use crate::tile::GeoPoint;

/// Angular speeds of the principal tidal constituents, degrees per hour.
/// Standard Doodson values; used to validate model files that omit the
/// speed and to build models in tests.
pub const CONSTITUENT_SPEEDS_DEG_PER_HOUR: [(&str, f64); 8] = [
    ("M2", 28.984_104_2),
    ("S2", 30.0),
    ("N2", 28.439_729_5),
    ("K2", 30.082_137_3),
    ("K1", 15.041_068_6),
    ("O1", 13.943_035_6),
    ("P1", 14.958_931_4),
    ("Q1", 13.398_660_9),
];

/// Regular latitude/longitude grid over which constituent constants are
/// stored. Node (i, j) is at (lat0 + i*dlat, lon0 + j*dlon).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GridSpec {
    pub lat0: f64,
    pub lon0: f64,
    pub dlat: f64,
    pub dlon: f64,
    pub nlat: usize,
    pub nlon: usize,
}

impl GridSpec {
    fn index(&self, i: usize, j: usize) -> usize {
        i * self.nlon + j
    }
}

/// Amplitude and phase-lag grids for one harmonic constituent.
///
/// Row-major over the model grid, latitude-major. NaN marks dry or
/// unmodelled nodes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConstituentGrid {
    pub name: String,
    /// Angular speed in degrees per hour.
    pub speed_deg_per_hour: f64,
    /// Amplitude in metres at each grid node.
    pub amplitude: Vec<f64>,
    /// Greenwich phase lag in degrees at each grid node.
    pub phase_deg: Vec<f64>,
}

/// Amplitude and phase of one constituent interpolated to a point.
#[derive(Clone, Copy, Debug)]
pub struct InterpolatedConstituent {
    pub speed_deg_per_hour: f64,
    pub amplitude: f64,
    pub phase_deg: f64,
}

/// Harmonic ocean-tide model: constituent constants on a spatial grid.
///
/// Loaded once at startup, immutable afterwards, shared read-only by all
/// workers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TideModel {
    pub grid: GridSpec,
    pub constituents: Vec<ConstituentGrid>,
}

impl TideModel {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let model: TideModel = toml::from_str(text)?;
        model.validate()?;
        Ok(model)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.constituents.is_empty() {
            return Err(CompositeError::InvalidConfig(
                "tide model has no constituents".to_string(),
            ));
        }
        if self.grid.nlat < 2 || self.grid.nlon < 2 {
            return Err(CompositeError::InvalidConfig(
                "tide model grid must be at least 2x2".to_string(),
            ));
        }
        if self.grid.dlat <= 0.0 || self.grid.dlon <= 0.0 {
            return Err(CompositeError::InvalidConfig(
                "tide model grid spacing must be positive".to_string(),
            ));
        }
        let nodes = self.grid.nlat * self.grid.nlon;
        for constituent in &self.constituents {
            if constituent.amplitude.len() != nodes || constituent.phase_deg.len() != nodes {
                return Err(CompositeError::InvalidConfig(format!(
                    "constituent {} has {} amplitude / {} phase values, grid has {} nodes",
                    constituent.name,
                    constituent.amplitude.len(),
                    constituent.phase_deg.len(),
                    nodes
                )));
            }
        }
        Ok(())
    }

    /// Bilinearly interpolate all constituent constants to `point`.
    ///
    /// Fails with `OutOfCoverage` when the point falls outside the grid
    /// or every surrounding node is unmodelled (NaN). Nodes that are NaN
    /// are dropped from the interpolation and the remaining weights are
    /// renormalised, so coastal points next to dry nodes still resolve.
    pub fn interpolate(&self, point: GeoPoint) -> Result<Vec<InterpolatedConstituent>> {
        let grid = &self.grid;
        if grid.nlat < 2 || grid.nlon < 2 {
            return Err(CompositeError::OutOfCoverage {
                lat: point.lat,
                lon: point.lon,
            });
        }
        let fi = (point.lat - grid.lat0) / grid.dlat;
        let fj = (point.lon - grid.lon0) / grid.dlon;
        if fi < 0.0
            || fj < 0.0
            || fi > (grid.nlat - 1) as f64
            || fj > (grid.nlon - 1) as f64
        {
            return Err(CompositeError::OutOfCoverage {
                lat: point.lat,
                lon: point.lon,
            });
        }

        let i0 = (fi.floor() as usize).min(grid.nlat - 2);
        let j0 = (fj.floor() as usize).min(grid.nlon - 2);
        let di = fi - i0 as f64;
        let dj = fj - j0 as f64;

        // Corner weights for (i0, j0), (i0, j0+1), (i0+1, j0), (i0+1, j0+1)
        let corners = [
            (grid.index(i0, j0), (1.0 - di) * (1.0 - dj)),
            (grid.index(i0, j0 + 1), (1.0 - di) * dj),
            (grid.index(i0 + 1, j0), di * (1.0 - dj)),
            (grid.index(i0 + 1, j0 + 1), di * dj),
        ];

        let mut result = Vec::with_capacity(self.constituents.len());
        for constituent in &self.constituents {
            let mut amp = 0.0;
            let mut phase_sin = 0.0;
            let mut phase_cos = 0.0;
            let mut weight_sum = 0.0;
            for &(idx, weight) in &corners {
                let a = constituent.amplitude[idx];
                let g = constituent.phase_deg[idx];
                if a.is_nan() || g.is_nan() {
                    continue;
                }
                amp += weight * a;
                // Interpolate the phase on the unit circle so lags that
                // wrap through 360 degrees average correctly.
                phase_sin += weight * g.to_radians().sin();
                phase_cos += weight * g.to_radians().cos();
                weight_sum += weight;
            }
            if weight_sum <= f64::EPSILON {
                return Err(CompositeError::OutOfCoverage {
                    lat: point.lat,
                    lon: point.lon,
                });
            }
            result.push(InterpolatedConstituent {
                speed_deg_per_hour: constituent.speed_deg_per_hour,
                amplitude: amp / weight_sum,
                phase_deg: phase_sin.atan2(phase_cos).to_degrees(),
            });
        }
        Ok(result)
    }
}
