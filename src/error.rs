//! Error handling for the camera link service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::camera_error::{CameraError, ErrorKind};

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Camera pipeline failure (already classified)
    #[error("Camera error: {0}")]
    Camera(CameraError),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<CameraError> for Error {
    fn from(e: CameraError) -> Self {
        Error::Camera(e)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            Error::Camera(e) => {
                let status = match e.kind {
                    ErrorKind::Configuration => StatusCode::CONFLICT,
                    ErrorKind::Network | ErrorKind::Api => StatusCode::BAD_GATEWAY,
                    ErrorKind::Hardware => StatusCode::SERVICE_UNAVAILABLE,
                    ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind.error_code(), e.message.clone())
            }
            Error::Http(e) => (StatusCode::BAD_GATEWAY, "HTTP_ERROR", e.to_string()),
        };

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
