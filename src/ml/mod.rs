//! Machine Learning Module
//!
//! Inference over pre-fitted artifacts only; nothing here trains a model.
//!
//! # Architecture
//! - `store`: loads the scaler and the four regressors from the model directory
//! - `scaler`: standard scaling of the feature record
//! - `models`: portable regressors (linear, tree ensembles)
//! - `inference`: runs every loaded regressor on one normalized row

use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum::Display;

pub mod inference;
pub mod models;
pub mod scaler;
pub mod store;

#[cfg(feature = "ml")]
pub mod smartcore;

/// Regressor family of a loaded artifact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelType {
    LinearRegression,
    TreeEnsemble,
    SmartcoreRandomForest,
}

/// Optional descriptive fields an artifact file may carry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(default)]
    pub name: Option<String>,
    /// Column names the artifact was fit on, in order
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
}

impl ArtifactMetadata {
    /// Compare declared feature names against the expected schema.
    pub fn check_schema(&self, expected: &[&str]) -> Result<()> {
        let Some(names) = &self.feature_names else {
            return Ok(());
        };
        if names.len() != expected.len() {
            anyhow::bail!(
                "artifact declares {} features, expected {}",
                names.len(),
                expected.len()
            );
        }
        if let Some((i, (got, want))) = names
            .iter()
            .zip(expected.iter())
            .enumerate()
            .find(|(_, (got, want))| got.as_str() != **want)
        {
            anyhow::bail!("feature {} is '{}', expected '{}'", i, got, want);
        }
        Ok(())
    }
}

/// Feature Vector for ML models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn new(features: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.len() != feature_names.len() {
            anyhow::bail!(
                "Feature count mismatch: {} features, {} names",
                features.len(),
                feature_names.len()
            );
        }
        Ok(Self {
            features,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Standardize features as `(x - mean) / scale`.
    ///
    /// A zero scale (constant column at fit time) is treated as 1.
    pub fn standardize(&self, means: &[f64], scales: &[f64]) -> Result<Self> {
        if means.len() != self.features.len() || scales.len() != self.features.len() {
            anyhow::bail!(
                "Standardization parameter count mismatch: {} features, {} means, {} scales",
                self.features.len(),
                means.len(),
                scales.len()
            );
        }

        let standardized = self
            .features
            .iter()
            .zip(means.iter().zip(scales.iter()))
            .map(|(f, (mean, scale))| {
                let scale = if scale.abs() < f64::EPSILON { 1.0 } else { *scale };
                (f - mean) / scale
            })
            .collect();

        Ok(Self {
            features: standardized,
            feature_names: self.feature_names.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn test_feature_vector_creation() {
        let fv = FeatureVector::new(vec![1.0, 2.0, 3.0], names(3)).unwrap();
        assert_eq!(fv.len(), 3);
        assert!(!fv.is_empty());

        assert!(FeatureVector::new(vec![1.0], names(2)).is_err());
    }

    #[test]
    fn test_feature_vector_standardize() {
        let fv = FeatureVector::new(vec![10.0, 20.0, 30.0], names(3)).unwrap();

        let standardized = fv
            .standardize(&[8.0, 20.0, 10.0], &[2.0, 5.0, 0.0])
            .unwrap();
        assert_eq!(standardized.features[0], 1.0); // (10-8)/2
        assert_eq!(standardized.features[1], 0.0); // (20-20)/5
        assert_eq!(standardized.features[2], 20.0); // zero scale leaves it centered only
    }

    #[test]
    fn test_standardize_arity_mismatch() {
        let fv = FeatureVector::new(vec![1.0, 2.0], names(2)).unwrap();
        assert!(fv.standardize(&[0.0], &[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_check_schema() {
        let meta = ArtifactMetadata {
            name: None,
            feature_names: Some(vec!["a".into(), "b".into()]),
        };
        assert!(meta.check_schema(&["a", "b"]).is_ok());
        assert!(meta.check_schema(&["b", "a"]).is_err());
        assert!(meta.check_schema(&["a"]).is_err());
        assert!(ArtifactMetadata::default().check_schema(&["x"]).is_ok());
    }
}
