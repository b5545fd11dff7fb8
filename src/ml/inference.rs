//! Prediction aggregation
//!
//! Runs one normalized row through every available regressor.

use tracing::{debug, warn};

use super::{models::MLModel, store::ArtifactSlot, FeatureVector};
use crate::domain::PredictionSet;

/// Predict with each model, in the given order.
///
/// A model that errors or yields a non-finite value is logged and left out of
/// the set, so one broken model cannot block the decision.
pub fn aggregate_predictions<'a, I>(models: I, features: &FeatureVector) -> PredictionSet
where
    I: IntoIterator<Item = (ArtifactSlot, &'a dyn MLModel)>,
{
    let mut predictions = PredictionSet::new();
    for (slot, model) in models {
        if let Some(expected) = model.n_features() {
            if expected != features.len() {
                warn!(
                    model = slot.display_name(),
                    expected,
                    got = features.len(),
                    "input width mismatch, model excluded"
                );
                continue;
            }
        }
        match model.predict(features) {
            Ok(kwh) if kwh.is_finite() => {
                debug!(
                    model = slot.display_name(),
                    model_type = %model.model_type(),
                    kwh,
                    "prediction"
                );
                predictions.insert(slot.display_name(), kwh);
            }
            Ok(kwh) => {
                warn!(model = slot.display_name(), kwh, "non-finite prediction discarded");
            }
            Err(e) => {
                warn!(model = slot.display_name(), error = %e, "prediction failed, model excluded");
            }
        }
    }
    predictions
}
