use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// JSON envelope for every `/api/v1` response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Default, Serialize)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    /// Prediction models currently usable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_models: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn update_metadata(mut self, f: impl FnOnce(&mut ResponseMetadata)) -> Self {
        f(self.metadata.get_or_insert_with(ResponseMetadata::default));
        self
    }

    pub fn with_count(self, count: usize) -> Self {
        self.update_metadata(|m| m.total_count = Some(count))
    }

    pub fn with_loaded_models(self, count: usize) -> Self {
        self.update_metadata(|m| m.loaded_models = Some(count))
    }

    pub fn with_duration(self, duration_ms: u64) -> Self {
        self.update_metadata(|m| m.duration_ms = Some(duration_ms))
    }
}

impl ApiResponse<()> {
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: Utc::now(),
            metadata: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
