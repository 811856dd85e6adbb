use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::{
    BAND_BLUE, BAND_GREEN, BAND_NIR, BAND_RED, GLINT_FACTOR_BLUE, GLINT_FACTOR_GREEN,
    GLINT_FACTOR_RED, GLINT_REFERENCE_THRESHOLD,
};
use crate::error::Result;
use crate::scene::{CuratedCollection, Scene};

/// Sun-glint correction calibration.
///
/// The glint estimate comes from a reference band where open water
/// should read near zero; each visible band subtracts a scaled copy of
/// it. The default factors were tuned against a representative set of
/// scenes off the north-west Australian coast.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlintParams {
    /// Band the glint estimate is read from.
    pub reference_band: String,
    /// Reference values are capped here so benthic reflection in
    /// shallow water is not mistaken for glint.
    pub reference_threshold: f32,
    /// Per-band subtraction factor. Bands not listed pass through
    /// unchanged.
    pub band_factors: BTreeMap<String, f32>,
}

impl Default for GlintParams {
    fn default() -> Self {
        let mut band_factors = BTreeMap::new();
        band_factors.insert(BAND_BLUE.to_string(), GLINT_FACTOR_BLUE);
        band_factors.insert(BAND_GREEN.to_string(), GLINT_FACTOR_GREEN);
        band_factors.insert(BAND_RED.to_string(), GLINT_FACTOR_RED);
        Self {
            reference_band: BAND_NIR.to_string(),
            reference_threshold: GLINT_REFERENCE_THRESHOLD,
            band_factors,
        }
    }
}

/// Remove the specular-reflection contribution from the visible bands.
///
/// corrected = clamp(band - factor * min(reference, threshold), 0, 1).
/// Returns a new scene; the input raster is untouched so repeated runs
/// are reproducible from the same source data. Pixels masked in the
/// reference band stay masked in the corrected bands.
pub fn correct_sun_glint(scene: &Scene, params: &GlintParams) -> Result<Scene> {
    let reference = scene.band(&params.reference_band)?;

    let mut corrected = Scene::new();
    for (name, data) in scene.iter() {
        let band = match params.band_factors.get(name) {
            Some(&factor) => {
                let mut out = data.clone();
                for (pixel, &r) in out.iter_mut().zip(reference.iter()) {
                    let glint = if r.is_nan() {
                        f32::NAN
                    } else {
                        r.min(params.reference_threshold)
                    };
                    *pixel = (*pixel - factor * glint).clamp(0.0, 1.0);
                }
                out
            }
            None => data.clone(),
        };
        corrected.insert_band(name, band)?;
    }
    Ok(corrected)
}

/// Apply sun-glint correction to every image of a curated collection,
/// preserving its length and ordering.
pub fn correct_collection(
    collection: &CuratedCollection,
    params: &GlintParams,
) -> Result<CuratedCollection> {
    collection.map_scenes(|scene| correct_sun_glint(scene, params))
}
