//! Regression models exported from training as JSON.
//!
//! Two layouts are understood: a linear model (`coefficients` + `intercept`)
//! and an ensemble of regression trees stored as flat node arrays, the way
//! tree learners usually export them. A node is a leaf when its left child
//! is `-1`; otherwise samples with `x[feature] <= threshold` go left.

use crate::domain::ports::PriceModel;
use crate::utils::error::{EstimatorError, Result};
use serde::{Deserialize, Serialize};

const LEAF: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Regressor {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Boosting: tree outputs are added to `base_score`.
    Sum,
    /// Random forest: tree outputs are averaged, then `base_score` is added.
    #[default]
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub trees: Vec<RegressionTree>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

impl Regressor {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let model: Regressor = serde_json::from_slice(bytes)?;
        model.check()?;
        Ok(model)
    }

    /// Number of input features the model reads, when the layout says so.
    pub fn n_features(&self) -> Option<usize> {
        match self {
            Regressor::Linear(linear) => Some(linear.coefficients.len()),
            Regressor::TreeEnsemble(_) => None,
        }
    }

    fn check(&self) -> Result<()> {
        match self {
            Regressor::Linear(linear) => {
                if linear.coefficients.is_empty() {
                    return Err(EstimatorError::artifact("model", "linear model has no coefficients"));
                }
                Ok(())
            }
            Regressor::TreeEnsemble(ensemble) => {
                if ensemble.trees.is_empty() {
                    return Err(EstimatorError::artifact("model", "tree ensemble has no trees"));
                }
                for (i, tree) in ensemble.trees.iter().enumerate() {
                    tree.check()
                        .map_err(|message| EstimatorError::artifact("model", format!("tree {}: {}", i, message)))?;
                }
                Ok(())
            }
        }
    }
}

impl LinearModel {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(EstimatorError::PredictionError {
                message: format!(
                    "linear model expects {} features, got {}",
                    self.coefficients.len(),
                    features.len()
                ),
            });
        }
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(c, x)| c * x)
            .sum();
        Ok(self.intercept + dot)
    }
}

impl RegressionTree {
    fn n_nodes(&self) -> usize {
        self.value.len()
    }

    fn check(&self) -> std::result::Result<(), String> {
        let n = self.n_nodes();
        if n == 0 {
            return Err("tree is empty".to_string());
        }
        if [
            self.children_left.len(),
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("node arrays have different lengths".to_string());
        }
        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF {
                continue;
            }
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(format!("node {} has invalid child {}", node, child));
                }
            }
            if self.feature[node] < 0 {
                return Err(format!("node {} splits on negative feature", node));
            }
        }
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        let mut node = 0usize;
        // 子節點索引必定遞增，最多走 n 步
        for _ in 0..self.n_nodes() {
            let left = self.children_left[node];
            if left == LEAF {
                return Ok(self.value[node]);
            }

            let feature = self.feature[node] as usize;
            let x = features.get(feature).ok_or_else(|| EstimatorError::PredictionError {
                message: format!(
                    "tree splits on feature {} but only {} features were given",
                    feature,
                    features.len()
                ),
            })?;

            let next = if *x <= self.threshold[node] {
                left
            } else {
                self.children_right[node]
            };
            node = usize::try_from(next).map_err(|_| EstimatorError::PredictionError {
                message: format!("node {} has invalid child {}", node, next),
            })?;
            if node >= self.n_nodes() {
                return Err(EstimatorError::PredictionError {
                    message: format!("child index {} out of range", node),
                });
            }
        }

        Err(EstimatorError::PredictionError {
            message: "tree traversal did not reach a leaf".to_string(),
        })
    }
}

impl TreeEnsemble {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.predict(features)?;
        }
        let combined = match self.aggregation {
            Aggregation::Sum => total,
            Aggregation::Mean => total / self.trees.len() as f64,
        };
        Ok(self.base_score + combined)
    }
}

impl PriceModel for Regressor {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        let raw = match self {
            Regressor::Linear(linear) => linear.predict(features)?,
            Regressor::TreeEnsemble(ensemble) => {
                if ensemble.trees.is_empty() {
                    return Err(EstimatorError::PredictionError {
                        message: "tree ensemble has no trees".to_string(),
                    });
                }
                ensemble.predict(features)?
            }
        };

        if !raw.is_finite() {
            return Err(EstimatorError::PredictionError {
                message: format!("model produced a non-finite value ({})", raw),
            });
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f64, low: f64, high: f64) -> RegressionTree {
        RegressionTree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![threshold, -2.0, -2.0],
            value: vec![0.0, low, high],
        }
    }

    #[test]
    fn test_linear_predict() {
        let model = Regressor::Linear(LinearModel {
            coefficients: vec![2.0, -1.0],
            intercept: 10.0,
        });
        assert_eq!(model.predict(&[3.0, 4.0]).unwrap(), 12.0);
        assert!(matches!(
            model.predict(&[1.0]),
            Err(EstimatorError::PredictionError { .. })
        ));
    }

    #[test]
    fn test_tree_ensemble_mean_and_sum() {
        let trees = vec![stump(0.5, 1000.0, 2000.0), stump(1.5, 3000.0, 5000.0)];
        let mean = Regressor::TreeEnsemble(TreeEnsemble {
            trees: trees.clone(),
            aggregation: Aggregation::Mean,
            base_score: 0.0,
        });
        assert_eq!(mean.predict(&[1.0]).unwrap(), 2500.0);

        let sum = Regressor::TreeEnsemble(TreeEnsemble {
            trees,
            aggregation: Aggregation::Sum,
            base_score: 100.0,
        });
        assert_eq!(sum.predict(&[0.0]).unwrap(), 4100.0);
    }

    #[test]
    fn test_tree_feature_out_of_range() {
        let model = Regressor::TreeEnsemble(TreeEnsemble {
            trees: vec![RegressionTree {
                feature: vec![4, -2, -2],
                ..stump(0.0, 1.0, 2.0)
            }],
            aggregation: Aggregation::Sum,
            base_score: 0.0,
        });
        assert!(matches!(
            model.predict(&[1.0]),
            Err(EstimatorError::PredictionError { .. })
        ));
    }

    #[test]
    fn test_non_finite_output_is_prediction_error() {
        let model = Regressor::Linear(LinearModel {
            coefficients: vec![f64::INFINITY],
            intercept: f64::NEG_INFINITY,
        });
        assert!(model.predict(&[1.0]).is_err());
    }

    #[test]
    fn test_from_json_tagged_layouts() {
        let linear = Regressor::from_json(
            br#"{"type": "linear", "coefficients": [1.0, 2.0], "intercept": 3.0}"#,
        )
        .unwrap();
        assert_eq!(linear.n_features(), Some(2));

        let forest = Regressor::from_json(
            br#"{
                "type": "tree_ensemble",
                "trees": [{
                    "children_left": [1, -1, -1],
                    "children_right": [2, -1, -1],
                    "feature": [0, -2, -2],
                    "threshold": [5.0, -2.0, -2.0],
                    "value": [0.0, 8000.0, 4000.0]
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(forest.n_features(), None);
        assert_eq!(forest.predict(&[10.0]).unwrap(), 4000.0);
    }

    #[test]
    fn test_from_json_rejects_cyclic_tree() {
        let err = Regressor::from_json(
            br#"{
                "type": "tree_ensemble",
                "trees": [{
                    "children_left": [0],
                    "children_right": [0],
                    "feature": [0],
                    "threshold": [1.0],
                    "value": [1.0]
                }]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, EstimatorError::ArtifactError { .. }));
    }
}
