use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CompositeError, Result};
use crate::scene::{CandidateImage, CuratedCollection, ScoredImage};
use crate::tide::model::TideModel;
use crate::tide::predict::predict_with_phase;
use crate::tile::Tile;

/// Which side of the height threshold a tide-filtered product keeps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TideWindow {
    /// Keep captures at or below the threshold (low-tide products).
    Below { max_height: f64 },
    /// Keep captures strictly above the threshold (above-mean-sea-level
    /// products).
    Above { min_height: f64 },
}

impl TideWindow {
    fn retains(&self, height: f64) -> bool {
        match self {
            Self::Below { max_height } => height <= *max_height,
            Self::Above { min_height } => height > *min_height,
        }
    }
}

/// Filter candidates by predicted tide height at the tile's water
/// centroid and rank them with the most extreme tide first.
///
/// Height and phase are computed once per image. Captures whose centroid
/// falls outside the tide model coverage are excluded with a warning,
/// never failing the tile. The result is sorted by ascending height for
/// `Below` windows (lowest tide first) and descending for `Above`, then
/// truncated to `max_images`. Fewer than `min_images` survivors is an
/// `InsufficientCandidates` error, which the orchestrator reports as a
/// tile skip.
pub fn select_by_tide(
    model: &TideModel,
    tile: &Tile,
    candidates: Vec<CandidateImage>,
    window: TideWindow,
    min_images: usize,
    max_images: usize,
) -> Result<CuratedCollection> {
    let total = candidates.len();
    let mut scored: Vec<ScoredImage> = Vec::with_capacity(total);
    for candidate in candidates {
        let (height, phase) =
            match predict_with_phase(model, tile.water_centroid, candidate.meta.timestamp) {
                Ok(prediction) => prediction,
                Err(err @ CompositeError::OutOfCoverage { .. }) => {
                    warn!(
                        tile = %tile.id,
                        image = %candidate.meta.id,
                        error = %err,
                        "excluding capture without tide coverage"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };
        if !window.retains(height) {
            continue;
        }
        scored.push(ScoredImage {
            candidate,
            noise_score: None,
            tide_height: Some(height),
            tide_phase: Some(phase),
        });
    }

    match window {
        TideWindow::Below { .. } => scored.sort_by(|a, b| {
            a.tide_height
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.tide_height.unwrap_or(f64::INFINITY))
        }),
        TideWindow::Above { .. } => scored.sort_by(|a, b| {
            b.tide_height
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&a.tide_height.unwrap_or(f64::NEG_INFINITY))
        }),
    }
    scored.truncate(max_images);

    if scored.len() < min_images {
        return Err(CompositeError::InsufficientCandidates {
            found: scored.len(),
            minimum: min_images,
        });
    }

    info!(
        tile = %tile.id,
        candidates = total,
        kept = scored.len(),
        window = ?window,
        "tide selection complete"
    );
    Ok(CuratedCollection::new(scored))
}
