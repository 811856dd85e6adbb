mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use lagoon_core::filters::sunglint::{correct_collection, correct_sun_glint, GlintParams};
use lagoon_core::quality::glint::{glint_proportion, screen_high_glint, GlintScreenParams};
use lagoon_core::scene::{CuratedCollection, Scene, ScoredImage};

use common::{candidate, uniform_scene};

fn visible_scene(b2: f32, b3: f32, b4: f32, b8: f32) -> Scene {
    Scene::from_bands([
        ("B2", Array2::from_elem((2, 2), b2)),
        ("B3", Array2::from_elem((2, 2), b3)),
        ("B4", Array2::from_elem((2, 2), b4)),
        ("B8", Array2::from_elem((2, 2), b8)),
    ])
    .unwrap()
}

#[test]
fn test_subtracts_scaled_reference() {
    let scene = visible_scene(0.5, 0.5, 0.5, 0.1);
    let corrected = correct_sun_glint(&scene, &GlintParams::default()).unwrap();
    // reference capped at 0.04
    assert_abs_diff_eq!(corrected.band("B2").unwrap()[[0, 0]], 0.5 - 0.85 * 0.04, epsilon = 1e-6);
    assert_abs_diff_eq!(corrected.band("B3").unwrap()[[0, 0]], 0.5 - 0.90 * 0.04, epsilon = 1e-6);
    assert_abs_diff_eq!(corrected.band("B4").unwrap()[[0, 0]], 0.5 - 0.95 * 0.04, epsilon = 1e-6);
    // the reference band itself passes through
    assert_abs_diff_eq!(corrected.band("B8").unwrap()[[0, 0]], 0.1, epsilon = 1e-6);
}

#[test]
fn test_shallow_water_uses_raw_reference() {
    let scene = visible_scene(0.5, 0.5, 0.5, 0.02);
    let corrected = correct_sun_glint(&scene, &GlintParams::default()).unwrap();
    assert_abs_diff_eq!(corrected.band("B2").unwrap()[[0, 0]], 0.5 - 0.85 * 0.02, epsilon = 1e-6);
}

#[test]
fn test_correction_clamps_at_zero() {
    let scene = visible_scene(0.01, 0.01, 0.01, 0.5);
    let corrected = correct_sun_glint(&scene, &GlintParams::default()).unwrap();
    for band in ["B2", "B3", "B4"] {
        assert_eq!(corrected.band(band).unwrap()[[0, 0]], 0.0);
    }
}

#[test]
fn test_input_scene_is_not_mutated() {
    let scene = visible_scene(0.5, 0.5, 0.5, 0.1);
    let _ = correct_sun_glint(&scene, &GlintParams::default()).unwrap();
    assert_abs_diff_eq!(scene.band("B2").unwrap()[[0, 0]], 0.5, epsilon = 1e-9);
}

#[test]
fn test_masked_reference_masks_corrected_bands() {
    let mut b8 = Array2::from_elem((2, 2), 0.1f32);
    b8[[0, 0]] = f32::NAN;
    let scene = Scene::from_bands([
        ("B2", Array2::from_elem((2, 2), 0.5f32)),
        ("B8", b8),
    ])
    .unwrap();
    let corrected = correct_sun_glint(&scene, &GlintParams::default()).unwrap();
    assert!(corrected.band("B2").unwrap()[[0, 0]].is_nan());
    assert!(!corrected.band("B2").unwrap()[[1, 1]].is_nan());
}

#[test]
fn test_missing_reference_band_is_an_error() {
    let scene = uniform_scene(&["B2", "B3"], 2, 2, 0.5);
    assert!(correct_sun_glint(&scene, &GlintParams::default()).is_err());
}

#[test]
fn test_collection_order_and_length_preserved() {
    let collection = CuratedCollection::new(vec![
        ScoredImage::unscored(candidate("a", 5.0, visible_scene(0.5, 0.5, 0.5, 0.1))),
        ScoredImage::unscored(candidate("b", 10.0, visible_scene(0.4, 0.4, 0.4, 0.1))),
        ScoredImage::unscored(candidate("c", 15.0, visible_scene(0.3, 0.3, 0.3, 0.1))),
    ]);
    let corrected = correct_collection(&collection, &GlintParams::default()).unwrap();
    assert_eq!(corrected.len(), 3);
    let ids: Vec<&str> = corrected.iter().map(|img| img.candidate.meta.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_glint_proportion_over_water() {
    // all pixels are water (B3 > B8) and NIR exceeds the 0.1 threshold
    let glinty = candidate("glinty", 5.0, visible_scene(0.1, 0.5, 0.1, 0.2));
    let params = GlintScreenParams::default();
    assert_abs_diff_eq!(glint_proportion(&glinty, &params).unwrap().unwrap(), 1.0);

    let calm = candidate("calm", 5.0, visible_scene(0.1, 0.5, 0.1, 0.05));
    assert_abs_diff_eq!(glint_proportion(&calm, &params).unwrap().unwrap(), 0.0);
}

#[test]
fn test_glint_proportion_without_water_is_none() {
    // land: NIR above green, NDWI negative everywhere
    let land = candidate("land", 5.0, visible_scene(0.1, 0.1, 0.1, 0.4));
    let params = GlintScreenParams::default();
    assert!(glint_proportion(&land, &params).unwrap().is_none());
}

#[test]
fn test_screening_drops_glinty_and_unassessable_images() {
    let params = GlintScreenParams::default();
    let candidates = vec![
        candidate("calm", 5.0, visible_scene(0.1, 0.5, 0.1, 0.05)),
        candidate("glinty", 10.0, visible_scene(0.1, 0.5, 0.1, 0.2)),
        candidate("land", 15.0, visible_scene(0.1, 0.1, 0.1, 0.4)),
    ];
    let kept = screen_high_glint(candidates, &params).unwrap();
    let ids: Vec<&str> = kept.iter().map(|c| c.meta.id.as_str()).collect();
    assert_eq!(ids, vec!["calm"]);
}
