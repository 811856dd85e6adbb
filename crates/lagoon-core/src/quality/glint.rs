use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{
    BAND_NIR, BAND_SWIR1, BAND_SWIR2, GLINT_SCREEN_MAX_PROPORTION, GLINT_SCREEN_NIR_THRESHOLD,
    GLINT_SCREEN_SWIR_THRESHOLD,
};
use crate::error::Result;
use crate::filters::ndwi::water_mask;
use crate::scene::CandidateImage;

/// Thresholds for screening out images dominated by sun glint before
/// they enter curation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlintScreenParams {
    /// NIR reflectance above which a water pixel counts as glinty.
    pub nir_threshold: f32,
    /// Mean SWIR reflectance above which a water pixel counts as glinty.
    pub swir_threshold: f32,
    /// Images with a higher glinty fraction of their water pixels are
    /// dropped.
    pub max_proportion: f64,
}

impl Default for GlintScreenParams {
    fn default() -> Self {
        Self {
            nir_threshold: GLINT_SCREEN_NIR_THRESHOLD,
            swir_threshold: GLINT_SCREEN_SWIR_THRESHOLD,
            max_proportion: GLINT_SCREEN_MAX_PROPORTION,
        }
    }
}

/// Fraction of water pixels whose NIR or mean SWIR reflectance exceeds
/// the glint thresholds. Water is taken from the NDWI mask. Returns
/// None when the scene has no water pixels to assess.
///
/// The SWIR pair is optional; scenes without it are judged on NIR
/// alone.
pub fn glint_proportion(
    candidate: &CandidateImage,
    params: &GlintScreenParams,
) -> Result<Option<f64>> {
    let scene = &candidate.scene;
    let water = water_mask(scene)?;
    let nir = scene.band(BAND_NIR)?;
    let swir = match (scene.band(BAND_SWIR1), scene.band(BAND_SWIR2)) {
        (Ok(swir1), Ok(swir2)) => Some((swir1, swir2)),
        _ => None,
    };

    let mut water_pixels = 0usize;
    let mut glinty = 0usize;
    for (idx, &is_water) in water.iter().enumerate() {
        if !is_water {
            continue;
        }
        water_pixels += 1;
        let row = idx / water.ncols();
        let col = idx % water.ncols();
        let nir_high = nir[[row, col]] > params.nir_threshold;
        let swir_high = swir
            .map(|(swir1, swir2)| {
                (swir1[[row, col]] + swir2[[row, col]]) / 2.0 > params.swir_threshold
            })
            .unwrap_or(false);
        if nir_high || swir_high {
            glinty += 1;
        }
    }

    if water_pixels == 0 {
        return Ok(None);
    }
    Ok(Some(glinty as f64 / water_pixels as f64))
}

/// Drop candidates whose in-water glint proportion exceeds the
/// threshold, keeping the input ordering. Candidates with no assessable
/// water are dropped as well, matching the catalog-side behaviour of
/// filtering on a missing property.
pub fn screen_high_glint(
    candidates: Vec<CandidateImage>,
    params: &GlintScreenParams,
) -> Result<Vec<CandidateImage>> {
    let total = candidates.len();
    let mut kept = Vec::with_capacity(total);
    for candidate in candidates {
        match glint_proportion(&candidate, params)? {
            Some(proportion) if proportion < params.max_proportion => kept.push(candidate),
            Some(proportion) => {
                debug!(
                    image = %candidate.meta.id,
                    proportion,
                    "dropping high sun-glint capture"
                );
            }
            None => {
                debug!(
                    image = %candidate.meta.id,
                    "dropping capture with no assessable water"
                );
            }
        }
    }
    if kept.len() < total {
        info!(total, kept = kept.len(), "sun-glint screening complete");
    }
    Ok(kept)
}
