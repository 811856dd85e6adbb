use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{CompositeError, Result};
use crate::scene::{CandidateImage, CuratedCollection, Scene, ScoredImage};
use crate::stack::percentile::median_scene;

/// Aggregate deviation of a scene from the low-noise baseline.
///
/// Mean absolute deviation over every band and pixel where both the
/// scene and the baseline hold valid data, normalised by the number of
/// pixels compared. Lower is better.
pub fn noise_score(scene: &Scene, baseline: &Scene) -> Result<f64> {
    let mut deviation = 0.0f64;
    let mut compared = 0usize;
    for (name, base) in baseline.iter() {
        let data = scene.band(name)?;
        if data.dim() != base.dim() {
            let (rows, cols) = base.dim();
            let (r, c) = data.dim();
            return Err(CompositeError::DimensionMismatch {
                band: name.to_string(),
                expected_rows: rows,
                expected_cols: cols,
                actual_rows: r,
                actual_cols: c,
            });
        }
        for (&v, &b) in data.iter().zip(base.iter()) {
            if v.is_nan() || b.is_nan() {
                continue;
            }
            deviation += (v - b).abs() as f64;
            compared += 1;
        }
    }
    if compared == 0 {
        return Err(CompositeError::CorruptImage(
            "no valid pixels overlap the noise baseline".to_string(),
        ));
    }
    Ok(deviation / compared as f64)
}

/// Rank candidates by how much noise they would add to the composite
/// and keep the quietest ones.
///
/// The first `min_images` candidates in stream order (best cloud cover
/// first) form the base set; their per-pixel median is the baseline.
/// Every candidate is scored against that baseline and accepted in
/// ascending score order until `max_images`, ties broken by the earlier
/// cloud-cover rank. No accepted image ever scores strictly higher than
/// a rejected one.
pub fn curate_by_noise(
    candidates: Vec<CandidateImage>,
    min_images: usize,
    max_images: usize,
) -> Result<CuratedCollection> {
    if candidates.len() < min_images {
        return Err(CompositeError::InsufficientCandidates {
            found: candidates.len(),
            minimum: min_images,
        });
    }

    let base_scenes: Vec<&Scene> = candidates
        .iter()
        .take(min_images)
        .map(|candidate| &candidate.scene)
        .collect();
    let baseline = median_scene(&base_scenes)?;

    let total = candidates.len();
    let mut scored: Vec<(usize, f64, CandidateImage)> = candidates
        .into_par_iter()
        .enumerate()
        .filter_map(|(rank, candidate)| match noise_score(&candidate.scene, &baseline) {
            Ok(score) => Some((rank, score, candidate)),
            Err(err) => {
                warn!(
                    image = %candidate.meta.id,
                    error = %err,
                    "excluding unscorable capture"
                );
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    scored.truncate(max_images);

    if scored.len() < min_images {
        return Err(CompositeError::InsufficientCandidates {
            found: scored.len(),
            minimum: min_images,
        });
    }

    info!(
        candidates = total,
        kept = scored.len(),
        base = min_images,
        "noise ranking complete"
    );
    Ok(CuratedCollection::new(
        scored
            .into_iter()
            .map(|(_, score, candidate)| ScoredImage {
                candidate,
                noise_score: Some(score),
                tide_height: None,
                tide_phase: None,
            })
            .collect(),
    ))
}
