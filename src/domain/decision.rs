//! HVAC decision engine
//!
//! Picks the lowest predicted next-hour load across all models and maps it onto
//! one of three actions using two load thresholds.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::prediction::PredictionSet;
use crate::config::DecisionConfig;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HvacAction {
    AcOn,
    FanOnly,
    HvacOff,
}

impl HvacAction {
    pub fn label(&self) -> &'static str {
        match self {
            HvacAction::AcOn => "AC ON – High Load Predicted",
            HvacAction::FanOnly => "Fan Only – Medium Load",
            HvacAction::HvacOff => "HVAC OFF – Low Load & Optimized",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            HvacAction::AcOn => Severity::High,
            HvacAction::FanOnly => Severity::Medium,
            HvacAction::HvacOff => Severity::Low,
        }
    }

    /// Banner color on the dashboard
    pub fn color(&self) -> &'static str {
        match self.severity() {
            Severity::High => "red",
            Severity::Medium => "orange",
            Severity::Low => "green",
        }
    }
}

/// Threshold policy. Both bands are exclusive at the lower edge:
/// exactly `high_load_kwh` is still medium, exactly `medium_load_kwh` is low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecisionPolicy {
    pub high_load_kwh: f64,
    pub medium_load_kwh: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            high_load_kwh: 35.0,
            medium_load_kwh: 25.0,
        }
    }
}

impl From<&DecisionConfig> for DecisionPolicy {
    fn from(cfg: &DecisionConfig) -> Self {
        Self {
            high_load_kwh: cfg.high_load_kwh,
            medium_load_kwh: cfg.medium_load_kwh,
        }
    }
}

impl DecisionPolicy {
    pub fn classify(&self, predicted_kwh: f64) -> HvacAction {
        if predicted_kwh > self.high_load_kwh {
            HvacAction::AcOn
        } else if predicted_kwh > self.medium_load_kwh {
            HvacAction::FanOnly
        } else {
            HvacAction::HvacOff
        }
    }

    /// `None` when no model produced a prediction.
    pub fn decide(&self, predictions: &PredictionSet) -> Option<Decision> {
        let (model, predicted_kwh) = predictions.minimum()?;
        let action = self.classify(predicted_kwh);
        Some(Decision {
            action,
            label: action.label().to_string(),
            severity: action.severity(),
            color: action.color().to_string(),
            model: model.to_string(),
            predicted_kwh,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub action: HvacAction,
    pub label: String,
    pub severity: Severity,
    pub color: String,
    /// Model whose prediction drove the decision
    pub model: String,
    pub predicted_kwh: f64,
}
