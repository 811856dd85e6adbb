use std::collections::BTreeMap;

use chrono::Utc;
use ndarray::Array2;
use rayon::prelude::*;
use tracing::info;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{CompositeError, Result};
use crate::scene::{CompositeImage, CuratedCollection, Scene};

/// Reduce a stack of rasters to one raster by taking the given
/// percentile of the valid (non-NaN) values at each pixel.
///
/// Rank selection uses linear interpolation between adjacent order
/// statistics: rank = percentile/100 * (n-1). Pixels with no valid
/// value in any input stay NaN with a contribution count of zero.
/// Parallelises at the row level for large rasters.
pub fn percentile_band(
    stack: &[&Array2<f32>],
    percentile: f32,
) -> Result<(Array2<f32>, Array2<u32>)> {
    validate_percentile(percentile)?;
    if stack.is_empty() {
        return Err(CompositeError::EmptyCollection);
    }
    let (rows, cols) = stack[0].dim();
    for data in stack {
        if data.dim() != (rows, cols) {
            return Err(CompositeError::DimensionMismatch {
                band: String::new(),
                expected_rows: rows,
                expected_cols: cols,
                actual_rows: data.dim().0,
                actual_cols: data.dim().1,
            });
        }
    }
    let n = stack.len();

    if rows * cols >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        // Row-parallel: each row allocates its own value buffer
        let reduced: Vec<(Vec<f32>, Vec<u32>)> = (0..rows)
            .into_par_iter()
            .map(|row| {
                let mut values = Vec::with_capacity(n);
                let mut row_result = vec![f32::NAN; cols];
                let mut row_counts = vec![0u32; cols];
                for col in 0..cols {
                    values.clear();
                    for data in stack {
                        let v = data[[row, col]];
                        if !v.is_nan() {
                            values.push(v);
                        }
                    }
                    row_counts[col] = values.len() as u32;
                    if !values.is_empty() {
                        row_result[col] = interpolated_rank(&mut values, percentile);
                    }
                }
                (row_result, row_counts)
            })
            .collect();

        let mut result = Array2::<f32>::from_elem((rows, cols), f32::NAN);
        let mut counts = Array2::<u32>::zeros((rows, cols));
        for (row, (row_result, row_counts)) in reduced.into_iter().enumerate() {
            for col in 0..cols {
                result[[row, col]] = row_result[col];
                counts[[row, col]] = row_counts[col];
            }
        }
        Ok((result, counts))
    } else {
        let mut result = Array2::<f32>::from_elem((rows, cols), f32::NAN);
        let mut counts = Array2::<u32>::zeros((rows, cols));
        let mut values = Vec::with_capacity(n);
        for row in 0..rows {
            for col in 0..cols {
                values.clear();
                for data in stack {
                    let v = data[[row, col]];
                    if !v.is_nan() {
                        values.push(v);
                    }
                }
                counts[[row, col]] = values.len() as u32;
                if !values.is_empty() {
                    result[[row, col]] = interpolated_rank(&mut values, percentile);
                }
            }
        }
        Ok((result, counts))
    }
}

/// Reduce every band of a scene stack. The band set and dimensions of
/// the first scene define the output; every scene must carry them all.
pub fn percentile_scene(
    scenes: &[&Scene],
    percentile: f32,
) -> Result<(Scene, BTreeMap<String, Array2<u32>>)> {
    validate_percentile(percentile)?;
    let first = scenes.first().ok_or(CompositeError::EmptyCollection)?;

    let mut reduced = Scene::new();
    let mut counts = BTreeMap::new();
    for (name, _) in first.iter() {
        let stack = scenes
            .iter()
            .map(|scene| scene.band(name))
            .collect::<Result<Vec<_>>>()?;
        let (band, band_counts) = percentile_band(&stack, percentile).map_err(|err| {
            match err {
                CompositeError::DimensionMismatch {
                    expected_rows,
                    expected_cols,
                    actual_rows,
                    actual_cols,
                    ..
                } => CompositeError::DimensionMismatch {
                    band: name.to_string(),
                    expected_rows,
                    expected_cols,
                    actual_rows,
                    actual_cols,
                },
                other => other,
            }
        })?;
        reduced.insert_band(name, band)?;
        counts.insert(name.to_string(), band_counts);
    }
    Ok((reduced, counts))
}

/// Per-pixel, per-band median of a scene stack. Robust central tendency
/// used as the baseline for noise scoring.
pub fn median_scene(scenes: &[&Scene]) -> Result<Scene> {
    percentile_scene(scenes, 50.0).map(|(scene, _)| scene)
}

/// Reduce a curated collection to the final composite for a tile.
pub fn percentile_composite(
    collection: &CuratedCollection,
    percentile: f32,
    tile_id: &str,
    version_tag: &str,
) -> Result<CompositeImage> {
    if collection.is_empty() {
        return Err(CompositeError::EmptyCollection);
    }
    let scenes = collection.scenes();
    let (scene, counts) = percentile_scene(&scenes, percentile)?;
    info!(
        tile = %tile_id,
        images = collection.len(),
        percentile,
        bands = scene.band_count(),
        "composite reduced"
    );
    Ok(CompositeImage {
        tile_id: tile_id.to_string(),
        percentile,
        scene,
        counts,
        image_count: collection.len(),
        version_tag: version_tag.to_string(),
        created: Utc::now(),
    })
}

fn validate_percentile(percentile: f32) -> Result<()> {
    if !(0.0..=100.0).contains(&percentile) || percentile.is_nan() {
        return Err(CompositeError::InvalidConfig(format!(
            "percentile must be within 0-100, got {percentile}"
        )));
    }
    Ok(())
}

/// Select the percentile from unsorted valid values with linear
/// interpolation between adjacent ranks.
fn interpolated_rank(values: &mut [f32], percentile: f32) -> f32 {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n == 1 {
        return values[0];
    }
    let rank = percentile as f64 / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return values[lo];
    }
    let frac = (rank - lo as f64) as f32;
    values[lo] + frac * (values[hi] - values[lo])
}
