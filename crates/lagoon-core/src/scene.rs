use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ndarray::Array2;

use crate::error::{CompositeError, Result};
use crate::tide::TidePhase;

/// A single multi-band raster at a fixed spatial resolution.
///
/// Band values are surface reflectance as f32 in [0.0, 1.0]; masked or
/// invalid pixels are NaN. All bands share the same dimensions. Scenes
/// are never mutated in place — corrections produce a new `Scene`.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    bands: BTreeMap<String, Array2<f32>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scene from (name, raster) pairs, checking that all bands
    /// share one shape.
    pub fn from_bands<I, S>(bands: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Array2<f32>)>,
        S: Into<String>,
    {
        let mut scene = Self::new();
        for (name, data) in bands {
            scene.insert_band(name, data)?;
        }
        Ok(scene)
    }

    /// Insert or replace a band. Fails with `DimensionMismatch` if the
    /// raster shape differs from the bands already present.
    pub fn insert_band(&mut self, name: impl Into<String>, data: Array2<f32>) -> Result<()> {
        let name = name.into();
        if let Some((rows, cols)) = self.dimensions() {
            let (r, c) = data.dim();
            if (r, c) != (rows, cols) {
                return Err(CompositeError::DimensionMismatch {
                    band: name,
                    expected_rows: rows,
                    expected_cols: cols,
                    actual_rows: r,
                    actual_cols: c,
                });
            }
        }
        self.bands.insert(name, data);
        Ok(())
    }

    pub fn band(&self, name: &str) -> Result<&Array2<f32>> {
        self.bands
            .get(name)
            .ok_or_else(|| CompositeError::MissingBand(name.to_string()))
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array2<f32>)> {
        self.bands.iter().map(|(name, data)| (name.as_str(), data))
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// (rows, cols) of the bands, or None for an empty scene.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.bands.values().next().map(|data| data.dim())
    }

    /// Fraction of pixels that are valid (non-NaN) in every band.
    /// Returns 0.0 for an empty scene.
    pub fn valid_fraction(&self) -> f32 {
        let Some((rows, cols)) = self.dimensions() else {
            return 0.0;
        };
        let total = rows * cols;
        if total == 0 {
            return 0.0;
        }
        let mut valid = 0usize;
        for row in 0..rows {
            for col in 0..cols {
                if self
                    .bands
                    .values()
                    .all(|data| !data[[row, col]].is_nan())
                {
                    valid += 1;
                }
            }
        }
        valid as f32 / total as f32
    }

    /// A new scene with every band value multiplied by `factor`. Used to
    /// convert digital numbers to reflectance.
    pub fn scaled(&self, factor: f32) -> Scene {
        let bands = self
            .bands
            .iter()
            .map(|(name, data)| (name.clone(), data.mapv(|v| v * factor)))
            .collect();
        Scene { bands }
    }
}

/// Capture metadata as reported by the image catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneMeta {
    /// Catalog identifier of the capture.
    pub id: String,
    /// Tile this capture belongs to.
    pub tile_id: String,
    /// Capture timestamp (UTC).
    pub timestamp: DateTime<Utc>,
    /// Reported whole-scene cloud cover percentage (0-100).
    pub cloud_cover_percent: f32,
    /// Relative orbit the capture was sensed from, when known. Captures
    /// from different orbits cover different slices of a tile.
    pub orbit_number: Option<u32>,
}

/// One satellite capture considered for inclusion in a composite.
#[derive(Clone, Debug)]
pub struct CandidateImage {
    pub meta: SceneMeta,
    pub scene: Scene,
}

/// A candidate with its curation scores attached.
///
/// Each score is computed exactly once per image per run; stages that do
/// not apply to the current product leave their field as None.
#[derive(Clone, Debug)]
pub struct ScoredImage {
    pub candidate: CandidateImage,
    /// Deviation from the low-noise baseline (noise-ranked products).
    pub noise_score: Option<f64>,
    /// Predicted tide height at capture time, metres relative to mean
    /// sea level (tide-filtered products).
    pub tide_height: Option<f64>,
    /// Tide phase over the capture window (tide-filtered products).
    pub tide_phase: Option<TidePhase>,
}

impl ScoredImage {
    pub fn unscored(candidate: CandidateImage) -> Self {
        Self {
            candidate,
            noise_score: None,
            tide_height: None,
            tide_phase: None,
        }
    }
}

/// Ordered subset of candidates selected for compositing for one tile.
///
/// Members are sorted by the selecting stage's ranking key and bounded
/// by the configured collection size.
#[derive(Clone, Debug, Default)]
pub struct CuratedCollection {
    images: Vec<ScoredImage>,
}

impl CuratedCollection {
    pub fn new(images: Vec<ScoredImage>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredImage> {
        self.images.iter()
    }

    pub fn scenes(&self) -> Vec<&Scene> {
        self.images.iter().map(|img| &img.candidate.scene).collect()
    }

    pub fn into_images(self) -> Vec<ScoredImage> {
        self.images
    }

    /// Apply a per-scene transformation, preserving order, length and
    /// all metadata/scores. Used for corrections and band derivations.
    pub fn map_scenes(&self, f: impl Fn(&Scene) -> Result<Scene>) -> Result<CuratedCollection> {
        let images = self
            .images
            .iter()
            .map(|img| {
                Ok(ScoredImage {
                    candidate: CandidateImage {
                        meta: img.candidate.meta.clone(),
                        scene: f(&img.candidate.scene)?,
                    },
                    noise_score: img.noise_score,
                    tide_height: img.tide_height,
                    tide_phase: img.tide_phase,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CuratedCollection { images })
    }
}

/// Final reduced raster for one tile.
///
/// Created once per tile per run, handed to the persistence sink, never
/// mutated afterwards.
#[derive(Clone, Debug)]
pub struct CompositeImage {
    pub tile_id: String,
    /// Percentile used for the reduction (0-100).
    pub percentile: f32,
    /// Reduced band set; pixels with no valid input remain NaN.
    pub scene: Scene,
    /// Per band, the number of images that contributed at each pixel.
    pub counts: BTreeMap<String, Array2<u32>>,
    /// Number of images in the curated collection that was reduced.
    pub image_count: usize,
    /// Product/version tag carried through to the persisted object key.
    pub version_tag: String,
    pub created: DateTime<Utc>,
}
