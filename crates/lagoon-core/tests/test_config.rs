use chrono::NaiveDate;

use lagoon_core::error::CompositeError;
use lagoon_core::io::catalog::CandidateOrdering;
use lagoon_core::pipeline::config::{CompositeConfig, Product};

#[test]
fn test_defaults_are_valid() {
    let config = CompositeConfig::default();
    config.validate(false).unwrap();
    assert_eq!(config.product, Product::TrueColour);
    assert_eq!(config.percentile, 15.0);
    assert_eq!(config.min_images_in_base, 30);
    assert_eq!(config.max_images_in_composite, 200);
    assert!(config.correct_sun_glint);
}

#[test]
fn test_minimal_toml_fills_defaults() {
    let config = CompositeConfig::from_toml_str(
        r#"
product = "TrueColour"
percentile = 30.0
"#,
    )
    .unwrap();
    assert_eq!(config.percentile, 30.0);
    assert_eq!(config.thread_count, 2);
    assert_eq!(config.max_cloud_cover_percent, 20.0);
}

#[test]
fn test_low_tide_product_from_toml() {
    let config = CompositeConfig::from_toml_str(
        r#"
max_cloud_cover_percent = 0.1
max_images_in_composite = 200
percentile = 30.0

[product.LowTide]
tide_height_threshold = 0.0
"#,
    )
    .unwrap();
    assert!(config.product.uses_tide());
    assert_eq!(config.product.name(), "LowTide");
    assert_eq!(config.product.candidate_ordering(), CandidateOrdering::Chronological);
}

#[test]
fn test_cloud_first_ordering_for_noise_products() {
    assert_eq!(
        Product::TrueColour.candidate_ordering(),
        CandidateOrdering::CloudCoverFirst
    );
}

#[test]
fn test_garbage_toml_is_invalid_config() {
    assert!(matches!(
        CompositeConfig::from_toml_str("percentile = \"very\""),
        Err(CompositeError::InvalidConfig(_))
    ));
}

#[test]
fn test_percentile_bounds_are_enforced() {
    let mut config = CompositeConfig::default();
    config.percentile = 120.0;
    assert!(config.validate(false).is_err());
    config.percentile = -3.0;
    assert!(config.validate(false).is_err());
}

#[test]
fn test_zero_threads_rejected() {
    let mut config = CompositeConfig::default();
    config.thread_count = 0;
    assert!(config.validate(false).is_err());
}

#[test]
fn test_collection_bounds_must_be_ordered() {
    let mut config = CompositeConfig::default();
    config.min_images_in_base = 10;
    config.max_images_in_composite = 5;
    assert!(config.validate(false).is_err());
}

#[test]
fn test_non_positive_thresholds_rejected() {
    let mut config = CompositeConfig::default();
    config.max_cloud_cover_percent = 0.0;
    assert!(config.validate(false).is_err());

    let mut config = CompositeConfig::default();
    config.scale_meters = -10.0;
    assert!(config.validate(false).is_err());
}

#[test]
fn test_reversed_date_range_rejected() {
    let mut config = CompositeConfig::default();
    config.start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    config.end_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    assert!(config.validate(false).is_err());
}

#[test]
fn test_tide_products_need_a_model() {
    let mut config = CompositeConfig::default();
    config.product = Product::Ndwi {
        tide_height_threshold: 0.0,
    };
    assert!(config.validate(false).is_err());
    config.validate(true).unwrap();
}

#[test]
fn test_product_serde_round_trip() {
    let product = Product::LowTide {
        tide_height_threshold: -0.2,
    };
    let json = serde_json::to_string(&product).unwrap();
    let back: Product = serde_json::from_str(&json).unwrap();
    assert_eq!(back, product);
}
