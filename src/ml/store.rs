//! Model store
//!
//! Owns the scaler and the four regressors. Every slot is loaded
//! independently and reports a typed status, so one bad file never hides the
//! others. The scaler is a required dependency; each regressor is optional.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;
use tracing::{info, warn};

use super::models::{MLModel, ModelFile};
use super::scaler::StandardScaler;
use crate::config::ModelsConfig;
use crate::domain::FEATURE_NAMES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactSlot {
    Scaler,
    Xgboost,
    RandomForest,
    Lightgbm,
    Catboost,
}

/// Model slots in prediction order. Decision ties resolve to the earliest.
pub const MODEL_SLOTS: [ArtifactSlot; 4] = [
    ArtifactSlot::Xgboost,
    ArtifactSlot::RandomForest,
    ArtifactSlot::Lightgbm,
    ArtifactSlot::Catboost,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    /// Evaluation cannot run without it
    Required,
    /// Excluded from evaluation when unavailable
    Optional,
}

impl ArtifactSlot {
    pub fn display_name(&self) -> &'static str {
        match self {
            ArtifactSlot::Scaler => "Scaler",
            ArtifactSlot::Xgboost => "XGBoost",
            ArtifactSlot::RandomForest => "Random Forest",
            ArtifactSlot::Lightgbm => "LightGBM",
            ArtifactSlot::Catboost => "CatBoost",
        }
    }

    pub fn dependency(&self) -> Dependency {
        match self {
            ArtifactSlot::Scaler => Dependency::Required,
            _ => Dependency::Optional,
        }
    }

    fn file_name<'a>(&self, cfg: &'a ModelsConfig) -> &'a str {
        match self {
            ArtifactSlot::Scaler => &cfg.scaler,
            ArtifactSlot::Xgboost => &cfg.xgboost,
            ArtifactSlot::RandomForest => &cfg.random_forest,
            ArtifactSlot::Lightgbm => &cfg.lightgbm,
            ArtifactSlot::Catboost => &cfg.catboost,
        }
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("{path} does not match the feature schema: {reason}")]
    Schema { path: PathBuf, reason: String },

    #[error("unsupported artifact format: {0}")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Loaded,
    Absent,
    Corrupt { reason: String },
}

enum SlotState<T> {
    Loaded(T),
    Absent,
    Corrupt(String),
}

impl<T> SlotState<T> {
    fn from_result(result: Result<T, ArtifactError>) -> Self {
        match result {
            Ok(v) => SlotState::Loaded(v),
            Err(ArtifactError::NotFound(_)) => SlotState::Absent,
            Err(e) => SlotState::Corrupt(e.to_string()),
        }
    }

    fn status(&self) -> ArtifactStatus {
        match self {
            SlotState::Loaded(_) => ArtifactStatus::Loaded,
            SlotState::Absent => ArtifactStatus::Absent,
            SlotState::Corrupt(reason) => ArtifactStatus::Corrupt {
                reason: reason.clone(),
            },
        }
    }

    fn loaded(&self) -> Option<&T> {
        match self {
            SlotState::Loaded(v) => Some(v),
            _ => None,
        }
    }
}

/// One row of the artifact status report
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReport {
    pub slot: ArtifactSlot,
    pub name: &'static str,
    pub path: PathBuf,
    pub dependency: Dependency,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

pub struct ModelStore {
    cfg: ModelsConfig,
    scaler: SlotState<StandardScaler>,
    models: Vec<(ArtifactSlot, SlotState<Box<dyn MLModel>>)>,
    /// File modification time seen at the last load; `None` when absent
    fingerprints: HashMap<ArtifactSlot, Option<SystemTime>>,
}

impl ModelStore {
    /// Load every artifact slot. Never fails; problems are recorded per slot.
    pub fn load(cfg: &ModelsConfig) -> Self {
        let mut store = Self {
            cfg: cfg.clone(),
            scaler: SlotState::Absent,
            models: MODEL_SLOTS
                .iter()
                .map(|slot| (*slot, SlotState::Absent))
                .collect(),
            fingerprints: HashMap::new(),
        };
        store.reload_all();
        store
    }

    pub fn dir(&self) -> &Path {
        &self.cfg.dir
    }

    pub fn path_of(&self, slot: ArtifactSlot) -> PathBuf {
        self.cfg.dir.join(slot.file_name(&self.cfg))
    }

    pub fn reload_all(&mut self) {
        for slot in ArtifactSlot::iter() {
            self.reload_slot(slot);
        }
    }

    /// Slots whose file appeared, vanished, or changed since the last load.
    pub fn changed_slots(&self) -> Vec<ArtifactSlot> {
        ArtifactSlot::iter()
            .filter(|slot| {
                let current = modified_time(&self.path_of(*slot));
                self.fingerprints.get(slot) != Some(&current)
            })
            .collect()
    }

    pub fn reload_slots(&mut self, slots: &[ArtifactSlot]) {
        for slot in slots {
            info!(slot = %slot, "artifact changed on disk, reloading");
            self.reload_slot(*slot);
        }
    }

    /// Reload every changed slot. Returns the slots that were reloaded.
    pub fn refresh_changed(&mut self) -> Vec<ArtifactSlot> {
        let changed = self.changed_slots();
        self.reload_slots(&changed);
        changed
    }

    fn reload_slot(&mut self, slot: ArtifactSlot) {
        let path = self.path_of(slot);
        self.fingerprints.insert(slot, modified_time(&path));

        if slot == ArtifactSlot::Scaler {
            let state = SlotState::from_result(load_scaler(&path));
            log_status(slot, &path, &state.status());
            self.scaler = state;
            return;
        }

        let state = SlotState::from_result(load_model(&path));
        log_status(slot, &path, &state.status());
        if let Some(entry) = self.models.iter_mut().find(|(s, _)| *s == slot) {
            entry.1 = state;
        }
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.loaded()
    }

    pub fn status(&self, slot: ArtifactSlot) -> ArtifactStatus {
        if slot == ArtifactSlot::Scaler {
            return self.scaler.status();
        }
        self.models
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, state)| state.status())
            .unwrap_or(ArtifactStatus::Absent)
    }

    /// Loaded regressors in slot order
    pub fn loaded_models(&self) -> impl Iterator<Item = (ArtifactSlot, &dyn MLModel)> {
        self.models
            .iter()
            .filter_map(|(slot, state)| state.loaded().map(|m| (*slot, m.as_ref())))
    }

    pub fn report(&self) -> Vec<ArtifactReport> {
        ArtifactSlot::iter()
            .map(|slot| ArtifactReport {
                slot,
                name: slot.display_name(),
                path: self.path_of(slot),
                dependency: slot.dependency(),
                status: self.status(slot),
            })
            .collect()
    }

    /// Required dependencies loaded and at least one optional model available.
    pub fn is_ready(&self) -> bool {
        self.scaler().is_some() && self.loaded_models().next().is_some()
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ArtifactError::NotFound(path.to_path_buf()),
        _ => ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

pub fn load_scaler(path: &Path) -> Result<StandardScaler, ArtifactError> {
    let bytes = read_artifact(path)?;
    let scaler: StandardScaler =
        serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    scaler.validate().map_err(|e| ArtifactError::Schema {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(scaler)
}

pub fn load_model(path: &Path) -> Result<Box<dyn MLModel>, ArtifactError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            let bytes = read_artifact(path)?;
            let file: ModelFile =
                serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Decode {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            file.validate(&FEATURE_NAMES)
                .map_err(|e| ArtifactError::Schema {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            Ok(file.into_model())
        }
        #[cfg(feature = "ml")]
        Some("bin") => {
            let bytes = read_artifact(path)?;
            let model = super::smartcore::SmartcoreRandomForest::from_bincode(&bytes).map_err(
                |e| ArtifactError::Decode {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                },
            )?;
            Ok(Box::new(model))
        }
        _ if !path.exists() => Err(ArtifactError::NotFound(path.to_path_buf())),
        _ => Err(ArtifactError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn log_status(slot: ArtifactSlot, path: &Path, status: &ArtifactStatus) {
    match status {
        ArtifactStatus::Loaded => info!(slot = %slot, path = %path.display(), "artifact loaded"),
        ArtifactStatus::Absent => match slot.dependency() {
            Dependency::Required => {
                warn!(slot = %slot, path = %path.display(), "required artifact missing")
            }
            Dependency::Optional => {
                info!(slot = %slot, path = %path.display(), "artifact missing, model excluded")
            }
        },
        ArtifactStatus::Corrupt { reason } => {
            warn!(slot = %slot, path = %path.display(), %reason, "artifact unusable")
        }
    }
}
