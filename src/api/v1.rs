use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::{
    api::{error::ApiError, response::ApiResponse},
    controller::{AppState, Evaluation},
    domain::{input_specs, DecisionPolicy, InputSpec, ParameterInputs},
    ml::store::{ArtifactReport, ArtifactStatus, Dependency},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/models", get(list_models))
        .route("/models/reload", post(reload_models))
        .route("/inputs", get(get_inputs))
        .fallback(not_found)
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PredictRequest {
    #[serde(flatten)]
    pub inputs: ParameterInputs,
    /// Evaluation time; the local clock when omitted
    pub at: Option<DateTime<FixedOffset>>,
}

/// POST /api/v1/predict - Evaluate one set of operating parameters
pub async fn predict(
    State(st): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<ApiResponse<Evaluation>, ApiError> {
    let start = Instant::now();
    let Json(req) = body.map_err(rejection_error)?;
    let evaluation = match req.at {
        Some(at) => st.advisor.evaluate(&req.inputs, at)?,
        None => st.advisor.evaluate_now(&req.inputs)?,
    };
    Ok(ApiResponse::success(evaluation).with_duration(start.elapsed().as_millis() as u64))
}

/// GET /api/v1/models - Status of every artifact slot
pub async fn list_models(
    State(st): State<AppState>,
) -> Result<ApiResponse<Vec<ArtifactReport>>, ApiError> {
    Ok(report_response(st.advisor.artifact_report()))
}

/// POST /api/v1/models/reload - Re-read all artifacts from disk
pub async fn reload_models(
    State(st): State<AppState>,
) -> Result<ApiResponse<Vec<ArtifactReport>>, ApiError> {
    Ok(report_response(st.advisor.reload()))
}

/// Body problems answer with the `ApiError` shape instead of axum's plain text.
fn rejection_error(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(e) => ApiError::ValidationError(e.body_text()),
        other => ApiError::BadRequest(other.body_text()),
    }
}

fn report_response(report: Vec<ArtifactReport>) -> ApiResponse<Vec<ArtifactReport>> {
    let slots = report.len();
    let loaded = report
        .iter()
        .filter(|r| r.dependency == Dependency::Optional && r.status == ArtifactStatus::Loaded)
        .count();
    ApiResponse::success(report)
        .with_count(slots)
        .with_loaded_models(loaded)
}

#[derive(Debug, Serialize)]
pub struct InputsResponse {
    pub inputs: Vec<InputSpec>,
    pub defaults: ParameterInputs,
    pub thresholds: DecisionPolicy,
}

/// GET /api/v1/inputs - Input bounds, defaults and decision thresholds
pub async fn get_inputs(State(st): State<AppState>) -> ApiResponse<InputsResponse> {
    ApiResponse::success(InputsResponse {
        inputs: input_specs(),
        defaults: ParameterInputs::default(),
        thresholds: *st.advisor.policy(),
    })
}

async fn not_found() -> ApiResponse<()> {
    ApiResponse::error(StatusCode::NOT_FOUND, "no such endpoint")
}
