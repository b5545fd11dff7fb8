use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::time::Instant;

use crate::controller::AppState;
use crate::ml::store::{ArtifactStatus, Dependency};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    checks: HealthChecks,
}

/// Individual health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    model_store: ComponentHealth,
}

/// Health status of a component
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loaded_models: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64, loaded_models: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            latency_ms: Some(latency_ms),
            loaded_models: Some(loaded_models),
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            latency_ms: None,
            loaded_models: None,
            error: Some(error),
        }
    }
}

/// GET /health - Health check endpoint
///
/// Healthy when the scaler and at least one model are loaded.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let model_store = check_model_store(&state, start);
    let all_healthy = model_store.status == "healthy";

    let response = HealthResponse {
        status: if all_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        timestamp: chrono::Utc::now(),
        checks: HealthChecks { model_store },
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        healthy = all_healthy,
        "Health check completed"
    );

    (status_code, Json(response))
}

fn check_model_store(state: &AppState, start: Instant) -> ComponentHealth {
    let report = state.advisor.artifact_report();

    let missing_required: Vec<&str> = report
        .iter()
        .filter(|r| r.dependency == Dependency::Required && r.status != ArtifactStatus::Loaded)
        .map(|r| r.name)
        .collect();
    if !missing_required.is_empty() {
        return ComponentHealth::unhealthy(format!(
            "required artifact unavailable: {}",
            missing_required.join(", ")
        ));
    }

    let loaded = report
        .iter()
        .filter(|r| r.dependency == Dependency::Optional && r.status == ArtifactStatus::Loaded)
        .count();
    if loaded == 0 {
        return ComponentHealth::unhealthy("no prediction model loaded".to_string());
    }

    ComponentHealth::healthy(start.elapsed().as_millis() as u64, loaded)
}

/// GET /health/ready - Readiness probe
///
/// Returns 200 once an evaluation can succeed
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.advisor.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_health_healthy() {
        let health = ComponentHealth::healthy(42, 4);
        assert_eq!(health.status, "healthy");
        assert_eq!(health.latency_ms, Some(42));
        assert_eq!(health.loaded_models, Some(4));
        assert!(health.error.is_none());
    }

    #[test]
    fn test_component_health_unhealthy() {
        let health = ComponentHealth::unhealthy("scaler missing".to_string());
        assert_eq!(health.status, "unhealthy");
        assert!(health.latency_ms.is_none());
        assert_eq!(health.error, Some("scaler missing".to_string()));
    }
}
