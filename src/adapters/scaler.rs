use crate::domain::ports::FeatureScaler;
use crate::utils::error::{EstimatorError, Result};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Standardizes each column as `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default = "default_true")]
    pub with_mean: bool,
    #[serde(default = "default_true")]
    pub with_std: bool,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self {
            mean,
            scale,
            with_mean: true,
            with_std: true,
        };
        scaler.check()?;
        Ok(scaler)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let scaler: StandardScaler = serde_json::from_slice(bytes)?;
        scaler.check()?;
        Ok(scaler)
    }

    fn check(&self) -> Result<()> {
        if self.mean.is_empty() {
            return Err(EstimatorError::artifact("scaler", "mean vector is empty"));
        }
        if self.mean.len() != self.scale.len() {
            return Err(EstimatorError::artifact(
                "scaler",
                format!(
                    "mean has {} entries but scale has {}",
                    self.mean.len(),
                    self.scale.len()
                ),
            ));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(EstimatorError::artifact("scaler", "non-finite mean or scale"));
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.mean.len() {
            return Err(EstimatorError::ScalingError {
                message: format!(
                    "expected {} features, got {}",
                    self.mean.len(),
                    features.len()
                ),
            });
        }

        let scaled = features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&mean, &scale))| {
                let centered = if self.with_mean { x - mean } else { x };
                // 常數欄位的 scale 為 0，視為 1
                if self.with_std && scale != 0.0 {
                    centered / scale
                } else {
                    centered
                }
            })
            .collect();

        Ok(scaled)
    }
}
