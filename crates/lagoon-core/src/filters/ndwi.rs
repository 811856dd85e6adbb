use ndarray::Array2;

use crate::consts::{BAND_GREEN, BAND_NDWI, BAND_NIR};
use crate::error::Result;
use crate::scene::Scene;

/// Normalised-difference water index: (green - nir) / (green + nir).
///
/// Positive over open water, negative over land and vegetation. Pixels
/// masked in either input, or with a zero denominator, come out NaN.
pub fn ndwi(scene: &Scene) -> Result<Array2<f32>> {
    let green = scene.band(BAND_GREEN)?;
    let nir = scene.band(BAND_NIR)?;
    let mut index = Array2::<f32>::from_elem(green.dim(), f32::NAN);
    for ((pixel, &g), &n) in index.iter_mut().zip(green.iter()).zip(nir.iter()) {
        let sum = g + n;
        if sum != 0.0 {
            *pixel = (g - n) / sum;
        }
    }
    Ok(index)
}

/// Water mask derived from NDWI: true where NDWI > 0. Masked pixels are
/// not water.
pub fn water_mask(scene: &Scene) -> Result<Array2<bool>> {
    Ok(ndwi(scene)?.mapv(|v| v > 0.0))
}

/// A new scene with the derived NDWI band appended.
pub fn with_ndwi_band(scene: &Scene) -> Result<Scene> {
    let index = ndwi(scene)?;
    let mut derived = scene.clone();
    derived.insert_band(BAND_NDWI, index)?;
    Ok(derived)
}
