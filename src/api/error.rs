use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::controller::AdvisorError;

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Error response that gets serialized to JSON
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error type string
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::InternalError(_) => "InternalServerError",
            ApiError::ServiceUnavailable(_) => "ServiceUnavailable",
        }
    }

    /// Message safe to show to a user
    pub fn public_message(&self) -> String {
        match self {
            ApiError::InternalError(_) => "An internal error occurred".to_string(),
            ApiError::BadRequest(m)
            | ApiError::ValidationError(m)
            | ApiError::ServiceUnavailable(m) => m.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::InternalError(_) => tracing::error!(error = %self, "API error occurred"),
            ApiError::ServiceUnavailable(_) => tracing::warn!(error = %self, "Service unavailable"),
            _ => tracing::debug!(error = %self, "Client error"),
        }

        let error_response = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.public_message(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<AdvisorError> for ApiError {
    fn from(error: AdvisorError) -> Self {
        match error {
            AdvisorError::InvalidInput(_) => ApiError::ValidationError(error.to_string()),
            AdvisorError::ScalerUnavailable(_) | AdvisorError::NoModelsAvailable => {
                ApiError::ServiceUnavailable(error.to_string())
            }
            AdvisorError::Normalization(_) => ApiError::InternalError(error.to_string()),
        }
    }
}
