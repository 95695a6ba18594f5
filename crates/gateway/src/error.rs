use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Request failures, rendered as `{"detail": ...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Model not loaded. Check server logs.")]
    ModelNotLoaded,

    #[error("Invalid image file")]
    InvalidImage,

    #[error("{0}")]
    InvalidUpload(String),

    #[error("{0}")]
    UploadTooLarge(String),

    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    #[error("Quality check failed: {0}")]
    QualityCheckFailed(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidImage => StatusCode::BAD_REQUEST,
            ApiError::InvalidUpload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::DetectionFailed(_) | ApiError::QualityCheckFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
