use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::MIN_VALID_PIXEL_FRACTION;
use crate::error::{CompositeError, Result};
use crate::scene::{CandidateImage, Scene, SceneMeta};
use crate::tile::{DateRange, Tile};

/// External source of satellite captures.
///
/// Implementations wrap a remote archive or a local store; they are
/// opaque to the core and must carry their own concurrency guarantees.
pub trait ImageCatalog: Send + Sync {
    /// Capture metadata for a tile within a time range. Implementations
    /// may return captures outside the range; the filter re-checks.
    fn query(&self, tile: &Tile, range: &DateRange) -> Result<Vec<SceneMeta>>;

    /// Decode the pixel data for one capture.
    fn load(&self, meta: &SceneMeta) -> Result<Scene>;
}

/// How the candidate list is ordered before curation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateOrdering {
    /// Least cloudy first, for products that curate on image quality.
    CloudCoverFirst,
    /// Capture time order, for products that curate on tide state.
    Chronological,
}

/// Candidate filtering knobs, carried over from the run configuration.
#[derive(Clone, Debug)]
pub struct FilterOptions {
    /// Captures with more reported cloud than this are dropped.
    pub max_cloud_cover_percent: f32,
    pub ordering: CandidateOrdering,
    /// When set, band values are multiplied by this on load to convert
    /// digital numbers to reflectance.
    pub reflectance_scale: Option<f32>,
    /// Captures with a smaller fraction of valid pixels are tile
    /// fragments and are dropped.
    pub min_valid_fraction: f32,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            max_cloud_cover_percent: 100.0,
            ordering: CandidateOrdering::CloudCoverFirst,
            reflectance_scale: None,
            min_valid_fraction: MIN_VALID_PIXEL_FRACTION,
        }
    }
}

/// Query the catalog for a tile and return the ordered candidate
/// stream.
///
/// Metadata filtering (inclusive date range, cloud-cover threshold) and
/// ordering happen up front; pixel data is decoded lazily as the stream
/// is consumed. An empty stream is not an error — the orchestrator
/// reports the tile as skipped.
pub fn filter_candidates<'a>(
    catalog: &'a dyn ImageCatalog,
    tile: &Tile,
    range: &DateRange,
    options: &FilterOptions,
) -> Result<CandidateStream<'a>> {
    let mut metas: Vec<SceneMeta> = catalog
        .query(tile, range)?
        .into_iter()
        .filter(|meta| range.contains(meta.timestamp))
        .filter(|meta| meta.cloud_cover_percent <= options.max_cloud_cover_percent)
        .collect();

    match options.ordering {
        CandidateOrdering::CloudCoverFirst => {
            metas.sort_by(|a, b| a.cloud_cover_percent.total_cmp(&b.cloud_cover_percent));
        }
        CandidateOrdering::Chronological => {
            metas.sort_by_key(|meta| meta.timestamp);
        }
    }

    debug!(
        tile = %tile.id,
        candidates = metas.len(),
        ordering = ?options.ordering,
        "catalog filtered"
    );
    Ok(CandidateStream {
        catalog,
        metas: metas.into(),
        reflectance_scale: options.reflectance_scale,
        min_valid_fraction: options.min_valid_fraction,
    })
}

/// Lazy, single-pass sequence of candidate images for one tile.
///
/// Scenes are decoded on `next()`; the stream is finite and not
/// restartable. Corrupt captures are skipped with a warning; transient
/// failures surface as errors so the orchestrator can retry the whole
/// filtering pass.
pub struct CandidateStream<'a> {
    catalog: &'a dyn ImageCatalog,
    metas: VecDeque<SceneMeta>,
    reflectance_scale: Option<f32>,
    min_valid_fraction: f32,
}

impl CandidateStream<'_> {
    /// Number of captures not yet decoded.
    pub fn remaining(&self) -> usize {
        self.metas.len()
    }
}

impl Iterator for CandidateStream<'_> {
    type Item = Result<CandidateImage>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let meta = self.metas.pop_front()?;
            let scene = match self.catalog.load(&meta) {
                Ok(scene) => scene,
                Err(err @ CompositeError::CorruptImage(_)) => {
                    warn!(image = %meta.id, error = %err, "skipping unreadable capture");
                    continue;
                }
                Err(err) => return Some(Err(err)),
            };
            let scene = match self.reflectance_scale {
                Some(factor) => scene.scaled(factor),
                None => scene,
            };
            if scene.valid_fraction() < self.min_valid_fraction {
                debug!(image = %meta.id, "skipping tile fragment");
                continue;
            }
            return Some(Ok(CandidateImage { meta, scene }));
        }
    }
}
