use price_estimator::adapters::{LinearModel, Regressor, StandardScaler};
use price_estimator::core::knowledge_base::{KnowledgeBaseBundle, DEFAULT_RARITY, DEFAULT_TIER, UNKNOWN_ID};
use price_estimator::core::pipeline::PRICE_FLOOR;
use price_estimator::domain::model::FeatureSource;
use price_estimator::{EstimatorError, InferencePipeline, KnowledgeBase, VehicleInput};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const FEATURES: [&str; 8] = [
    "car_age",
    "mileage",
    "miles_per_year",
    "brand_tier",
    "model_rarity",
    "brand_encoded",
    "model_encoded",
    "is_auction",
];

fn knowledge_base(features: &[&str]) -> KnowledgeBase {
    let mut brand_to_models = BTreeMap::new();
    brand_to_models.insert(
        "Toyota".to_string(),
        ["Camry", "Corolla"].iter().map(|s| s.to_string()).collect(),
    );
    brand_to_models.insert(
        "Porsche".to_string(),
        ["911"].iter().map(|s| s.to_string()).collect(),
    );

    KnowledgeBase::from_bundle(KnowledgeBaseBundle {
        brand_to_models,
        brand_map: HashMap::from([("Toyota".to_string(), 3), ("Porsche".to_string(), 1)]),
        model_map: HashMap::from([
            ("Camry".to_string(), 17),
            ("Corolla".to_string(), 18),
            ("911".to_string(), 2),
        ]),
        tier_map: HashMap::from([("Toyota".to_string(), 2), ("Porsche".to_string(), 4)]),
        rarity_map: HashMap::from([(17, 40.0), (2, 90.0)]),
        features: features.iter().map(|s| s.to_string()).collect(),
    })
    .unwrap()
}

/// Unit scaler and a linear model whose weights make the price easy to read.
fn pipeline(coefficients: Vec<f64>, intercept: f64) -> InferencePipeline<StandardScaler, Regressor> {
    let width = coefficients.len();
    InferencePipeline::new(
        knowledge_base(&FEATURES),
        StandardScaler::new(vec![0.0; width], vec![1.0; width]).unwrap(),
        Regressor::Linear(LinearModel {
            coefficients,
            intercept,
        }),
        2025,
    )
}

#[test]
fn test_toyota_camry_feature_vector() {
    let pipeline = pipeline(vec![-500.0, -0.05, 0.0, 1000.0, 10.0, 0.0, 0.0, -250.0], 20_000.0);
    let input = VehicleInput::new("Toyota", "Camry", 2015, 50_000.0, false);

    let estimate = pipeline.estimate(&input).unwrap();

    assert_eq!(
        estimate.features.values(),
        &[10.0, 50_000.0, 5_000.0, 2.0, 40.0, 3.0, 17.0, 0.0]
    );
    // 20000 - 5000 - 2500 + 2000 + 400
    assert!((estimate.price - 14_900.0).abs() < 1e-6);
    assert!(estimate.price >= PRICE_FLOOR);
}

#[test]
fn test_unknown_vehicle_still_gets_a_price() {
    let pipeline = pipeline(vec![0.0; 8], -3_000.0);
    let input = VehicleInput::new("UnknownCo", "Ghost", 2025, 0.0, false);

    let estimate = pipeline.estimate(&input).unwrap();
    let features = &estimate.features;

    assert_eq!(features.feature_value("car_age"), Some(0.0));
    assert_eq!(features.feature_value("miles_per_year"), Some(0.0));
    assert_eq!(features.feature_value("brand_encoded"), Some(UNKNOWN_ID as f64));
    assert_eq!(features.feature_value("model_encoded"), Some(UNKNOWN_ID as f64));
    assert_eq!(features.feature_value("brand_tier"), Some(DEFAULT_TIER as f64));
    assert_eq!(features.feature_value("model_rarity"), Some(DEFAULT_RARITY));
    assert_eq!(estimate.price, PRICE_FLOOR);
    assert!(estimate.was_floored());
}

#[test]
fn test_new_cars_use_full_mileage_per_year() {
    let pipeline = pipeline(vec![0.0; 8], 10_000.0);

    for year in [2025, 2026, 2040] {
        let input = VehicleInput::new("Porsche", "911", year, 8_421.0, true);
        let estimate = pipeline.estimate(&input).unwrap();
        assert!(estimate.features.feature_value("car_age").unwrap() <= 0.0);
        assert_eq!(estimate.features.feature_value("miles_per_year"), Some(8_421.0));
    }
}

#[test]
fn test_known_encodings_are_stable() {
    let kb = knowledge_base(&FEATURES);
    for brand in kb.brands() {
        for model in kb.models_for_brand(brand) {
            let first = (kb.brand_id(brand), kb.model_id(model));
            let second = (kb.brand_id(brand), kb.model_id(model));
            assert!(first.0 >= 0 && first.1 >= 0);
            assert_eq!(first, second);
        }
    }
}

#[test]
fn test_price_is_never_below_floor() {
    // 大幅負權重讓原始預測為負
    let pipeline = pipeline(vec![-10_000.0, -1.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.0);

    for (year, mileage) in [(2000, 250_000.0), (2010, 120_000.0), (2024, 3_000.0)] {
        let input = VehicleInput::new("Toyota", "Corolla", year, mileage, year % 2 == 0);
        let estimate = pipeline.estimate(&input).unwrap();
        assert!(estimate.raw_price < 0.0);
        assert_eq!(estimate.price, PRICE_FLOOR);
    }
}

#[test]
fn test_feature_order_not_produced_is_schema_mismatch() {
    let mut features = FEATURES.to_vec();
    features.push("color_code");
    let pipeline = InferencePipeline::new(
        knowledge_base(&features),
        StandardScaler::new(vec![0.0; 9], vec![1.0; 9]).unwrap(),
        Regressor::Linear(LinearModel {
            coefficients: vec![1.0; 9],
            intercept: 0.0,
        }),
        2025,
    );

    let input = VehicleInput::new("Toyota", "Camry", 2015, 50_000.0, false);
    let err = pipeline.estimate(&input).unwrap_err();

    assert!(matches!(err, EstimatorError::SchemaMismatch { .. }));
    assert!(err.user_friendly_message().contains("color_code"));
}

#[test]
fn test_reordered_feature_order_changes_layout_only() {
    let shuffled = ["is_auction", "model_encoded", "car_age", "mileage", "brand_tier", "model_rarity", "brand_encoded", "miles_per_year"];
    let pipeline = InferencePipeline::new(
        knowledge_base(&shuffled),
        StandardScaler::new(vec![0.0; 8], vec![1.0; 8]).unwrap(),
        Regressor::Linear(LinearModel {
            coefficients: vec![0.0; 8],
            intercept: 1_000.0,
        }),
        2025,
    );

    let input = VehicleInput::new("Toyota", "Camry", 2015, 50_000.0, true);
    let estimate = pipeline.estimate(&input).unwrap();
    assert_eq!(
        estimate.features.values(),
        &[1.0, 17.0, 10.0, 50_000.0, 2.0, 40.0, 3.0, 5_000.0]
    );
}

#[test]
fn test_shared_pipeline_across_threads() {
    let pipeline = Arc::new(pipeline(vec![0.0, -0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 30_000.0));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || {
                let input = VehicleInput::new("Toyota", "Camry", 2015, 10_000.0 * i as f64, false);
                pipeline.estimate(&input).unwrap().price
            })
        })
        .collect();

    let prices: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(prices, vec![30_000.0, 29_000.0, 28_000.0, 27_000.0]);
}
