use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{ArtifactMetadata, FeatureVector};
use crate::domain::{FeatureRecord, FEATURE_COUNT, FEATURE_NAMES};

/// Standard scaler fitted offline, stored as `scaler.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(flatten)]
    pub metadata: ArtifactMetadata,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            metadata: ArtifactMetadata::default(),
            mean,
            scale,
        }
    }

    /// Checks the scaler was fit on the feature record's columns.
    pub fn validate(&self) -> Result<()> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            anyhow::bail!(
                "scaler has {} means and {} scales, expected {}",
                self.mean.len(),
                self.scale.len(),
                FEATURE_COUNT
            );
        }
        if self
            .mean
            .iter()
            .chain(self.scale.iter())
            .any(|v| !v.is_finite())
        {
            anyhow::bail!("scaler parameters must be finite");
        }
        self.metadata.check_schema(&FEATURE_NAMES)
    }

    pub fn transform(&self, record: &FeatureRecord) -> Result<FeatureVector> {
        let raw = FeatureVector::new(
            record.values().to_vec(),
            FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
        )?;
        raw.standardize(&self.mean, &self.scale)
    }
}
