use crate::core::features::{derive_features, order_features};
use crate::core::knowledge_base::KnowledgeBase;
use crate::domain::model::{PriceEstimate, VehicleInput};
use crate::domain::ports::{FeatureScaler, PriceModel};
use crate::utils::error::{EstimatorError, Result};

/// Lowest price ever reported.
pub const PRICE_FLOOR: f64 = 500.0;

pub const DEFAULT_REFERENCE_YEAR: i32 = 2025;

/// Estimate the price of one vehicle.
///
/// Derives the features, lays them out in the knowledge base's feature order,
/// scales them, runs the model and applies [`PRICE_FLOOR`]. Unknown brands and
/// models are not errors; the only failures are schema mismatches, scaler
/// failures and model failures.
pub fn estimate_price<S, M>(
    input: &VehicleInput,
    knowledge_base: &KnowledgeBase,
    scaler: &S,
    model: &M,
    reference_year: i32,
) -> Result<PriceEstimate>
where
    S: FeatureScaler + ?Sized,
    M: PriceModel + ?Sized,
{
    let features = derive_features(input, knowledge_base, reference_year);
    tracing::debug!("Derived features: {:?}", features);

    let ordered = order_features(&features, knowledge_base.feature_order())?;
    let scaled = scaler.transform(ordered.values())?;
    let raw_price = model.predict(&scaled)?;

    let price = raw_price.max(PRICE_FLOOR);
    if price > raw_price {
        tracing::debug!("Raw price {:.2} raised to floor {:.2}", raw_price, PRICE_FLOOR);
    }

    Ok(PriceEstimate {
        price,
        raw_price,
        features: ordered,
    })
}

/// Knowledge base, scaler and model bundled with the reference year.
///
/// Everything inside is read-only after construction, so one pipeline can be
/// shared across threads behind an `Arc`.
pub struct InferencePipeline<S: FeatureScaler, M: PriceModel> {
    knowledge_base: KnowledgeBase,
    scaler: S,
    model: M,
    reference_year: i32,
}

impl<S: FeatureScaler, M: PriceModel> InferencePipeline<S, M> {
    pub fn new(knowledge_base: KnowledgeBase, scaler: S, model: M, reference_year: i32) -> Self {
        Self {
            knowledge_base,
            scaler,
            model,
            reference_year,
        }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    pub fn estimate(&self, input: &VehicleInput) -> Result<PriceEstimate> {
        estimate_price(
            input,
            &self.knowledge_base,
            &self.scaler,
            &self.model,
            self.reference_year,
        )
        .inspect_err(|e| {
            tracing::error!("❌ Estimate failed for {} {}: {}", input.brand, input.model, e);
        })
    }

    /// Fails when the scaler width disagrees with the feature order.
    pub fn check_compatibility(&self) -> Result<()> {
        let expected = self.knowledge_base.feature_order().len();
        let actual = self.scaler.n_features();
        if expected != actual {
            return Err(EstimatorError::artifact(
                "scaler",
                format!(
                    "scaler was fitted on {} features but the feature order lists {}",
                    actual, expected
                ),
            ));
        }
        Ok(())
    }
}
