//! ML Model Definitions
//!
//! Portable regressor artifacts. Gradient-boosted and bagged tree models from
//! any trainer are exported to the common `tree_ensemble` layout; linear models
//! keep their coefficients.

use super::{ArtifactMetadata, FeatureVector, ModelType};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Trait for ML models
pub trait MLModel: Send + Sync {
    /// Predict next-hour energy (kWh) from one normalized row
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    fn model_type(&self) -> ModelType;

    /// Number of input columns, when the artifact pins it
    fn n_features(&self) -> Option<usize> {
        None
    }
}

/// Simple Linear Regression Model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressionModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressionModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }
}

impl MLModel for LinearRegressionModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            anyhow::bail!(
                "Feature count mismatch: expected {}, got {}",
                self.coefficients.len(),
                features.len()
            );
        }

        Ok(features
            .features
            .iter()
            .zip(self.coefficients.iter())
            .map(|(f, c)| f * c)
            .sum::<f64>()
            + self.intercept)
    }

    fn model_type(&self) -> ModelType {
        ModelType::LinearRegression
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }
}

/// How per-tree outputs combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Boosted ensembles: base score plus the sum of leaves
    #[default]
    Sum,
    /// Bagged ensembles (random forest): base score plus the mean of leaves
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go to `left` when `x[feature] < threshold`, otherwise `right`.
    /// Missing values (NaN) follow `default_left`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default = "default_left")]
        default_left: bool,
    },
    Leaf {
        leaf: f64,
    },
}

fn default_left() -> bool {
    true
}

/// Flattened binary tree; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("tree has no nodes");
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        anyhow::bail!(
                            "node {} splits on feature {} but only {} features exist",
                            i,
                            feature,
                            n_features
                        );
                    }
                    if threshold.is_nan() {
                        anyhow::bail!("node {} has a NaN threshold", i);
                    }
                    if *left >= self.nodes.len() || *right >= self.nodes.len() {
                        anyhow::bail!("node {} points outside the tree", i);
                    }
                }
                TreeNode::Leaf { leaf } => {
                    if !leaf.is_finite() {
                        anyhow::bail!("node {} has a non-finite leaf value", i);
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        let mut idx = 0;
        // a well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..self.nodes.len() {
            match &self.nodes[idx] {
                TreeNode::Leaf { leaf } => return Ok(*leaf),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = x
                        .get(*feature)
                        .copied()
                        .ok_or_else(|| anyhow::anyhow!("feature {} missing from input", feature))?;
                    let go_left = if value.is_nan() {
                        *default_left
                    } else {
                        value < *threshold
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
        anyhow::bail!("tree traversal did not reach a leaf (cycle in node links)")
    }
}

/// Tree ensemble regressor (XGBoost, LightGBM, CatBoost, random forest)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsembleModel {
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub aggregation: Aggregation,
    pub trees: Vec<RegressionTree>,
}

impl TreeEnsembleModel {
    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.trees.is_empty() {
            anyhow::bail!("ensemble has no trees");
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|e| anyhow::anyhow!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

impl MLModel for TreeEnsembleModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if self.trees.is_empty() {
            anyhow::bail!("ensemble has no trees");
        }
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.evaluate(&features.features)?;
        }
        let combined = match self.aggregation {
            Aggregation::Sum => total,
            Aggregation::Mean => total / self.trees.len() as f64,
        };
        Ok(self.base_score + combined)
    }

    fn model_type(&self) -> ModelType {
        ModelType::TreeEnsemble
    }
}

/// Regressor payload of a model file, tagged by `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorArtifact {
    Linear(LinearRegressionModel),
    TreeEnsemble(TreeEnsembleModel),
}

/// JSON model file: optional metadata plus the regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(flatten)]
    pub metadata: ArtifactMetadata,
    #[serde(flatten)]
    pub model: RegressorArtifact,
}

impl ModelFile {
    /// Structural and schema checks against the expected column names.
    pub fn validate(&self, expected: &[&str]) -> Result<()> {
        self.metadata.check_schema(expected)?;
        match &self.model {
            RegressorArtifact::Linear(m) => {
                if m.coefficients.len() != expected.len() {
                    anyhow::bail!(
                        "linear model has {} coefficients, expected {}",
                        m.coefficients.len(),
                        expected.len()
                    );
                }
                if !m.intercept.is_finite() || m.coefficients.iter().any(|c| !c.is_finite()) {
                    anyhow::bail!("linear model parameters must be finite");
                }
                Ok(())
            }
            RegressorArtifact::TreeEnsemble(m) => m.validate(expected.len()),
        }
    }

    pub fn into_model(self) -> Box<dyn MLModel> {
        match self.model {
            RegressorArtifact::Linear(m) => Box::new(m),
            RegressorArtifact::TreeEnsemble(m) => Box::new(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(values: Vec<f64>) -> FeatureVector {
        let names = (0..values.len()).map(|i| format!("f{i}")).collect();
        FeatureVector::new(values, names).unwrap()
    }

    fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                    default_left: true,
                },
                TreeNode::Leaf { leaf: left },
                TreeNode::Leaf { leaf: right },
            ],
        }
    }

    #[test]
    fn test_linear_regression_predict() {
        let model = LinearRegressionModel::new(vec![2.0, 3.0, 1.0], 5.0);

        let prediction = model.predict(&fv(vec![1.0, 2.0, 3.0])).unwrap();
        // 2*1 + 3*2 + 1*3 + 5 = 16
        assert_eq!(prediction, 16.0);
        assert!(model.predict(&fv(vec![1.0])).is_err());
    }

    #[test]
    fn test_boosted_ensemble_sums() {
        let model = TreeEnsembleModel {
            base_score: 0.5,
            aggregation: Aggregation::Sum,
            trees: vec![stump(0, 1.0, 10.0, 20.0), stump(1, 0.0, 1.0, 2.0)],
        };

        assert_eq!(model.predict(&fv(vec![0.5, 3.0])).unwrap(), 0.5 + 10.0 + 2.0);
        // threshold comparison is strict: equal goes right
        assert_eq!(model.predict(&fv(vec![1.0, -1.0])).unwrap(), 0.5 + 20.0 + 1.0);
    }

    #[test]
    fn test_forest_averages() {
        let model = TreeEnsembleModel {
            base_score: 0.0,
            aggregation: Aggregation::Mean,
            trees: vec![stump(0, 1.0, 10.0, 20.0), stump(0, 5.0, 30.0, 40.0)],
        };
        assert_eq!(model.predict(&fv(vec![2.0])).unwrap(), 25.0);
    }

    #[test]
    fn test_nan_follows_default_direction() {
        let mut tree = stump(0, 1.0, 10.0, 20.0);
        if let TreeNode::Split { default_left, .. } = &mut tree.nodes[0] {
            *default_left = false;
        }
        let model = TreeEnsembleModel {
            base_score: 0.0,
            aggregation: Aggregation::Sum,
            trees: vec![tree],
        };
        assert_eq!(model.predict(&fv(vec![f64::NAN])).unwrap(), 20.0);
    }

    #[test]
    fn test_cyclic_tree_detected() {
        let tree = RegressionTree {
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 0,
                default_left: true,
            }],
        };
        assert!(tree.validate(1).is_ok());
        assert!(tree.evaluate(&[0.0]).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_feature_index() {
        let model = TreeEnsembleModel {
            base_score: 0.0,
            aggregation: Aggregation::Sum,
            trees: vec![stump(12, 1.0, 0.0, 1.0)],
        };
        assert!(model.validate(12).is_err());
        assert!(model.validate(13).is_ok());
    }

    #[test]
    fn test_model_file_parsing() {
        let json = r#"{
            "name": "xgb-2024-05",
            "kind": "tree_ensemble",
            "base_score": 0.5,
            "trees": [
                {"nodes": [
                    {"feature": 0, "threshold": 0.25, "left": 1, "right": 2},
                    {"leaf": 12.0},
                    {"leaf": 18.0}
                ]}
            ]
        }"#;
        let file: ModelFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.metadata.name.as_deref(), Some("xgb-2024-05"));
        assert!(file.validate(&["a", "b"]).is_ok());

        let model = file.into_model();
        assert_eq!(model.model_type(), ModelType::TreeEnsemble);
        assert_eq!(model.predict(&fv(vec![0.0, 0.0])).unwrap(), 12.5);
    }

    #[test]
    fn test_linear_file_wrong_arity() {
        let json = r#"{"kind": "linear", "coefficients": [1.0, 2.0], "intercept": 0.0}"#;
        let file: ModelFile = serde_json::from_str(json).unwrap();
        assert!(file.validate(&["a", "b", "c"]).is_err());
        assert!(file.validate(&["a", "b"]).is_ok());
    }

    #[test]
    fn test_unknown_kind_fails_to_parse() {
        let json = r#"{"kind": "neural_net", "layers": []}"#;
        assert!(serde_json::from_str::<ModelFile>(json).is_err());
    }
}
