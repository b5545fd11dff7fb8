//! SmartCore RandomForest artifacts
//!
//! `*.bin` model files hold a bincode-serialized SmartCore
//! `RandomForestRegressor`. Only available with the `ml` feature.

use super::{models::MLModel, FeatureVector, ModelType};
use anyhow::Result;
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

pub struct SmartcoreRandomForest {
    model: Forest,
}

impl SmartcoreRandomForest {
    pub fn new(model: Forest) -> Self {
        Self { model }
    }

    /// Restore a model from serialized bytes
    pub fn from_bincode(bytes: &[u8]) -> Result<Self> {
        let model: Forest = bincode::deserialize(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to deserialize model: {}", e))?;
        Ok(Self { model })
    }

    pub fn to_bincode(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.model)
            .map_err(|e| anyhow::anyhow!("Failed to serialize model: {}", e))
    }
}

impl MLModel for SmartcoreRandomForest {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        // one row, n features
        let x = DenseMatrix::new(1, features.len(), features.features.clone(), false);

        let predictions = self
            .model
            .predict(&x)
            .map_err(|e| anyhow::anyhow!("Prediction failed: {:?}", e))?;

        predictions
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Model returned empty predictions"))
    }

    fn model_type(&self) -> ModelType {
        ModelType::SmartcoreRandomForest
    }
}
