//! Read-only lookup tables produced at training time.
//!
//! Every lookup has a total default so that an unknown brand or model never
//! fails an estimate: ids fall back to [`UNKNOWN_ID`], tiers to
//! [`DEFAULT_TIER`] and rarity scores to [`DEFAULT_RARITY`].

use crate::domain::model::Feature;
use crate::utils::error::{EstimatorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub const UNKNOWN_ID: i64 = -1;
pub const DEFAULT_TIER: i64 = 1;
pub const DEFAULT_RARITY: f64 = 50.0;

const ARTIFACT: &str = "knowledge base";

/// On-disk layout of the knowledge base bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBaseBundle {
    pub brand_to_models: BTreeMap<String, BTreeSet<String>>,
    pub brand_map: HashMap<String, i64>,
    pub model_map: HashMap<String, i64>,
    #[serde(default)]
    pub tier_map: HashMap<String, i64>,
    #[serde(default)]
    pub rarity_map: HashMap<i64, f64>,
    pub features: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    brand_to_models: BTreeMap<String, BTreeSet<String>>,
    brand_ids: HashMap<String, i64>,
    model_ids: HashMap<String, i64>,
    brand_tiers: HashMap<String, i64>,
    model_rarity: HashMap<i64, f64>,
    feature_order: Vec<String>,
}

impl KnowledgeBase {
    pub fn from_bundle(bundle: KnowledgeBaseBundle) -> Result<Self> {
        if bundle.features.is_empty() {
            return Err(EstimatorError::artifact(ARTIFACT, "feature order is empty"));
        }

        let mut seen = HashSet::new();
        for name in &bundle.features {
            if !seen.insert(name.as_str()) {
                return Err(EstimatorError::artifact(
                    ARTIFACT,
                    format!("feature '{}' appears more than once in the feature order", name),
                ));
            }
        }

        // 推導出的每個特徵都必須恰好出現一次
        if let Some(missing) = Feature::ALL
            .iter()
            .find(|f| !seen.contains(f.as_str()))
        {
            return Err(EstimatorError::artifact(
                ARTIFACT,
                format!("feature order is missing '{}'", missing),
            ));
        }

        if let Some((brand, _)) = bundle
            .brand_to_models
            .iter()
            .find(|(_, models)| models.is_empty())
        {
            return Err(EstimatorError::artifact(
                ARTIFACT,
                format!("brand '{}' has no models", brand),
            ));
        }

        for (kind, map) in [("brand", &bundle.brand_map), ("model", &bundle.model_map)] {
            if let Some((name, id)) = map.iter().find(|(_, &id)| id < 0) {
                return Err(EstimatorError::artifact(
                    ARTIFACT,
                    format!("{} '{}' has negative id {}", kind, name, id),
                ));
            }
        }

        Ok(Self {
            brand_to_models: bundle.brand_to_models,
            brand_ids: bundle.brand_map,
            model_ids: bundle.model_map,
            brand_tiers: bundle.tier_map,
            model_rarity: bundle.rarity_map,
            feature_order: bundle.features,
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let bundle: KnowledgeBaseBundle = serde_json::from_slice(bytes)?;
        Self::from_bundle(bundle)
    }

    /// Sorted brand names, as offered to the user.
    pub fn brands(&self) -> Vec<&str> {
        self.brand_to_models.keys().map(String::as_str).collect()
    }

    /// Sorted model names for `brand`; empty when the brand is unknown.
    pub fn models_for_brand(&self, brand: &str) -> Vec<&str> {
        self.brand_to_models
            .get(brand)
            .map(|models| models.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn brand_id(&self, brand: &str) -> i64 {
        self.brand_ids.get(brand).copied().unwrap_or(UNKNOWN_ID)
    }

    pub fn model_id(&self, model: &str) -> i64 {
        self.model_ids.get(model).copied().unwrap_or(UNKNOWN_ID)
    }

    pub fn tier_for_brand(&self, brand: &str) -> i64 {
        self.brand_tiers.get(brand).copied().unwrap_or(DEFAULT_TIER)
    }

    /// Keyed by encoded model id, not by model name.
    pub fn rarity_for_model_id(&self, id: i64) -> f64 {
        self.model_rarity.get(&id).copied().unwrap_or(DEFAULT_RARITY)
    }

    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }
}
