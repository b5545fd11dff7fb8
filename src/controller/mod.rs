use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use validator::Validate;

use crate::config::{Config, ReloadPolicy};
use crate::domain::{
    Decision, DecisionPolicy, FeatureRecord, ParameterInputs, PredictionSet, TimeFeatures,
};
use crate::ml::inference::aggregate_predictions;
use crate::ml::store::{ArtifactReport, ArtifactSlot, ArtifactStatus, ModelStore};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub advisor: Arc<HvacAdvisor>,
}

impl AppState {
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        let store = ModelStore::load(&cfg.models);
        let ready = store.is_ready();
        info!(
            dir = %store.dir().display(),
            models = store.loaded_models().count(),
            scaler = store.scaler().is_some(),
            ready,
            "model store initialized"
        );

        let advisor = Arc::new(HvacAdvisor::new(
            store,
            DecisionPolicy::from(&cfg.decision),
            cfg.models.reload,
        ));
        Ok(Self { cfg, advisor })
    }
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("Scaler unavailable: {0}")]
    ScalerUnavailable(String),

    #[error("No models available: every prediction model is missing or unusable")]
    NoModelsAvailable,

    #[error("normalization failed: {0}")]
    Normalization(String),
}

/// Outcome of one evaluation, recreated for every request
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub evaluated_at: DateTime<FixedOffset>,
    pub record: FeatureRecord,
    pub normalized: Vec<f64>,
    pub predictions: PredictionSet,
    pub decision: Decision,
}

/// Runs the collect → normalize → predict → decide pipeline over the shared
/// model store.
pub struct HvacAdvisor {
    store: RwLock<ModelStore>,
    policy: DecisionPolicy,
    reload: ReloadPolicy,
}

impl HvacAdvisor {
    pub fn new(store: ModelStore, policy: DecisionPolicy, reload: ReloadPolicy) -> Self {
        Self {
            store: RwLock::new(store),
            policy,
            reload,
        }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn evaluate_now(&self, inputs: &ParameterInputs) -> Result<Evaluation, AdvisorError> {
        self.evaluate(inputs, Local::now().fixed_offset())
    }

    pub fn evaluate(
        &self,
        inputs: &ParameterInputs,
        at: DateTime<FixedOffset>,
    ) -> Result<Evaluation, AdvisorError> {
        inputs
            .validate()
            .map_err(|e| AdvisorError::InvalidInput(e.to_string()))?;

        let time = TimeFeatures::from_datetime(&at);
        let record = FeatureRecord::collect(inputs, &time);

        self.refresh_if_needed();
        let store = self.store.read();

        let scaler = store.scaler().ok_or_else(|| {
            AdvisorError::ScalerUnavailable(match store.status(ArtifactSlot::Scaler) {
                ArtifactStatus::Corrupt { reason } => reason,
                _ => format!(
                    "{} not found",
                    store.path_of(ArtifactSlot::Scaler).display()
                ),
            })
        })?;
        let normalized = scaler
            .transform(&record)
            .map_err(|e| AdvisorError::Normalization(e.to_string()))?;

        let predictions = aggregate_predictions(store.loaded_models(), &normalized);
        let decision = self
            .policy
            .decide(&predictions)
            .ok_or(AdvisorError::NoModelsAvailable)?;

        debug!(
            models = predictions.len(),
            chosen = %decision.model,
            kwh = decision.predicted_kwh,
            action = %decision.action,
            "evaluation complete"
        );

        Ok(Evaluation {
            evaluated_at: at,
            record,
            normalized: normalized.features,
            predictions,
            decision,
        })
    }

    /// Detects changes under the read lock; the write lock is taken only when
    /// something on disk actually moved.
    fn refresh_if_needed(&self) {
        if self.reload != ReloadPolicy::OnChange {
            return;
        }
        if self.store.read().changed_slots().is_empty() {
            return;
        }
        // re-check under the write lock; another request may have reloaded first
        self.store.write().refresh_changed();
    }

    pub fn artifact_report(&self) -> Vec<ArtifactReport> {
        self.refresh_if_needed();
        self.store.read().report()
    }

    /// Re-read every artifact regardless of the reload policy.
    pub fn reload(&self) -> Vec<ArtifactReport> {
        let mut store = self.store.write();
        store.reload_all();
        info!(ready = store.is_ready(), "artifacts reloaded");
        store.report()
    }

    pub fn is_ready(&self) -> bool {
        self.refresh_if_needed();
        self.store.read().is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelsConfig;
    use crate::domain::HvacAction;
    use chrono::TimeZone;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn wednesday_2pm() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 13, 14, 0, 0)
            .unwrap()
    }

    fn write_scaler(dir: &Path) {
        let json = serde_json::json!({ "mean": vec![0.0; 12], "scale": vec![1.0; 12] });
        fs::write(dir.join("scaler.json"), json.to_string()).unwrap();
    }

    /// Predicts `Energy_Lag1 * weight + intercept`.
    fn write_lag_model(dir: &Path, file: &str, weight: f64, intercept: f64) {
        let mut coefficients = vec![0.0; 12];
        coefficients[11] = weight;
        let json = serde_json::json!({
            "kind": "linear",
            "coefficients": coefficients,
            "intercept": intercept,
        });
        fs::write(dir.join(file), json.to_string()).unwrap();
    }

    fn advisor(dir: &Path, reload: ReloadPolicy) -> HvacAdvisor {
        let cfg = ModelsConfig {
            dir: dir.to_path_buf(),
            reload,
            ..ModelsConfig::default()
        };
        HvacAdvisor::new(ModelStore::load(&cfg), DecisionPolicy::default(), reload)
    }

    #[test]
    fn test_full_pipeline() {
        let tmp = TempDir::new().unwrap();
        write_scaler(tmp.path());
        write_lag_model(tmp.path(), "xgb_model.json", 1.0, 0.0);
        write_lag_model(tmp.path(), "rf_model.json", 1.0, -2.0);
        write_lag_model(tmp.path(), "lgbm_model.json", 1.0, 4.0);

        let advisor = advisor(tmp.path(), ReloadPolicy::Startup);
        let eval = advisor
            .evaluate(&ParameterInputs::default(), wednesday_2pm())
            .unwrap();

        assert_eq!(eval.record.day_of_week, 2.0);
        assert_eq!(eval.record.holiday, 0.0);
        assert_eq!(eval.record.hour, 14.0);
        assert_eq!(eval.predictions.len(), 3);
        assert_eq!(eval.decision.model, "Random Forest");
        assert_eq!(eval.decision.predicted_kwh, 33.0);
        assert_eq!(eval.decision.action, HvacAction::FanOnly);
    }

    #[test]
    fn test_missing_scaler_is_reported() {
        let tmp = TempDir::new().unwrap();
        write_lag_model(tmp.path(), "xgb_model.json", 1.0, 0.0);

        let advisor = advisor(tmp.path(), ReloadPolicy::Startup);
        let err = advisor
            .evaluate(&ParameterInputs::default(), wednesday_2pm())
            .unwrap_err();
        assert!(matches!(err, AdvisorError::ScalerUnavailable(_)));
        assert!(err.to_string().starts_with("Scaler unavailable"));
    }

    #[test]
    fn test_no_models_is_reported() {
        let tmp = TempDir::new().unwrap();
        write_scaler(tmp.path());

        let advisor = advisor(tmp.path(), ReloadPolicy::Startup);
        let err = advisor
            .evaluate(&ParameterInputs::default(), wednesday_2pm())
            .unwrap_err();
        assert!(matches!(err, AdvisorError::NoModelsAvailable));
    }

    #[test]
    fn test_invalid_input_rejected_before_inference() {
        let tmp = TempDir::new().unwrap();
        let advisor = advisor(tmp.path(), ReloadPolicy::Startup);
        let inputs = ParameterInputs {
            occupancy: 301,
            ..Default::default()
        };
        assert!(matches!(
            advisor.evaluate(&inputs, wednesday_2pm()),
            Err(AdvisorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_identical_inputs_identical_decision() {
        let tmp = TempDir::new().unwrap();
        write_scaler(tmp.path());
        write_lag_model(tmp.path(), "cat_model.json", 0.5, 0.0);

        let advisor = advisor(tmp.path(), ReloadPolicy::Startup);
        let a = advisor
            .evaluate(&ParameterInputs::default(), wednesday_2pm())
            .unwrap();
        let b = advisor
            .evaluate(&ParameterInputs::default(), wednesday_2pm())
            .unwrap();
        assert_eq!(a.decision, b.decision);
        assert_eq!(a.decision.action, HvacAction::HvacOff);
    }

    #[test]
    fn test_startup_policy_ignores_new_files_until_reload() {
        let tmp = TempDir::new().unwrap();
        write_scaler(tmp.path());
        let advisor = advisor(tmp.path(), ReloadPolicy::Startup);

        write_lag_model(tmp.path(), "xgb_model.json", 1.0, 5.0);
        assert!(advisor
            .evaluate(&ParameterInputs::default(), wednesday_2pm())
            .is_err());

        advisor.reload();
        let eval = advisor
            .evaluate(&ParameterInputs::default(), wednesday_2pm())
            .unwrap();
        assert_eq!(eval.decision.action, HvacAction::AcOn);
    }

    #[test]
    fn test_on_change_policy_picks_up_new_files() {
        let tmp = TempDir::new().unwrap();
        write_scaler(tmp.path());
        let advisor = advisor(tmp.path(), ReloadPolicy::OnChange);
        assert!(!advisor.is_ready());

        write_lag_model(tmp.path(), "lgbm_model.json", 0.0, 12.0);
        let eval = advisor
            .evaluate(&ParameterInputs::default(), wednesday_2pm())
            .unwrap();
        assert_eq!(eval.decision.model, "LightGBM");
        assert!(advisor.is_ready());
    }

    #[test]
    fn test_unchanged_artifacts_only_need_read_lock() {
        let tmp = TempDir::new().unwrap();
        write_scaler(tmp.path());
        write_lag_model(tmp.path(), "xgb_model.json", 1.0, 0.0);
        let advisor = Arc::new(advisor(tmp.path(), ReloadPolicy::OnChange));

        // another reader holds the store for the whole evaluation
        let held = advisor.store.read();
        let (tx, rx) = std::sync::mpsc::channel();
        let worker = Arc::clone(&advisor);
        std::thread::spawn(move || {
            let result = worker.evaluate(&ParameterInputs::default(), wednesday_2pm());
            let _ = tx.send(result.map(|e| e.decision.model));
        });

        let model = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("evaluation blocked behind a reader")
            .unwrap();
        assert_eq!(model, "XGBoost");
        drop(held);
    }
}
