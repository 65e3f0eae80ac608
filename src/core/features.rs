use crate::core::knowledge_base::{KnowledgeBase, UNKNOWN_ID};
use crate::domain::model::{FeatureSource, OrderedFeatures, VehicleFeatures, VehicleInput};
use crate::utils::error::{EstimatorError, Result};

/// Derive the model features for one vehicle.
///
/// `reference_year` anchors the age computation; it is configuration, never
/// the wall clock, so the same input always yields the same features.
pub fn derive_features(
    input: &VehicleInput,
    knowledge_base: &KnowledgeBase,
    reference_year: i32,
) -> VehicleFeatures {
    let car_age = reference_year.saturating_sub(input.year);

    // 當年或未來年份的車以一年計，避免除以零或負數
    let age_for_calc = if car_age > 0 { car_age } else { 1 };
    let miles_per_year = input.mileage / age_for_calc as f64;

    let brand_encoded = knowledge_base.brand_id(&input.brand);
    let model_encoded = knowledge_base.model_id(&input.model);
    let brand_tier = knowledge_base.tier_for_brand(&input.brand);
    let model_rarity = knowledge_base.rarity_for_model_id(model_encoded);

    if brand_encoded == UNKNOWN_ID {
        tracing::warn!("Unknown brand '{}', using sentinel encoding", input.brand);
    }
    if model_encoded == UNKNOWN_ID {
        tracing::warn!("Unknown model '{}', using sentinel encoding", input.model);
    }

    VehicleFeatures {
        car_age,
        mileage: input.mileage,
        miles_per_year,
        brand_tier,
        model_rarity,
        brand_encoded,
        model_encoded,
        is_auction: input.is_auction,
    }
}

/// Lay features out in `order`. Features not named in `order` are dropped;
/// a name in `order` with no value is a schema mismatch.
pub fn order_features<F: FeatureSource>(source: &F, order: &[String]) -> Result<OrderedFeatures> {
    let mut values = Vec::with_capacity(order.len());
    for name in order {
        let value = source
            .feature_value(name)
            .ok_or_else(|| EstimatorError::SchemaMismatch {
                feature: name.clone(),
            })?;
        values.push(value);
    }
    Ok(OrderedFeatures::new(order.to_vec(), values))
}
