//! Shared models and types
//!
//! API request/response bodies used by the web layer.

use serde::{Deserialize, Serialize};

use crate::camera_backend::CameraType;
use crate::camera_link::{ConnectionState, NetworkStatus};
use crate::image_path::ResolutionCacheStats;

/// Standard API response wrapper. Failures are rendered by
/// [`crate::Error`] as `{error_code, message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub camera_type: CameraType,
    pub camera_state: ConnectionState,
    pub network: NetworkStatus,
}

/// Body of `POST /api/camera/type`
#[derive(Debug, Clone, Deserialize)]
pub struct SelectCameraTypeRequest {
    pub camera_type: String,
}

/// Body of `POST /api/camera/index`
#[derive(Debug, Clone, Deserialize)]
pub struct SetCameraIndexRequest {
    pub index: u32,
}

/// Query of `GET /api/images/resolve`
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveImageQuery {
    pub path: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Resolved image URL
#[derive(Debug, Clone, Serialize)]
pub struct ResolveImageResponse {
    pub path: String,
    pub url: String,
}

/// Debug view of settings and cache counters
#[derive(Debug, Clone, Serialize)]
pub struct DebugSettingsResponse {
    pub debug_mode: bool,
    pub show_debug_panel: bool,
    pub max_poll_retries: u32,
    pub resolution_cache: ResolutionCacheStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_shape() {
        let ok = serde_json::to_value(ApiResponse::success(3)).unwrap();
        assert_eq!(ok, serde_json::json!({"ok": true, "data": 3}));
    }

    #[test]
    fn test_resolve_query_token_optional() {
        let q: ResolveImageQuery = serde_json::from_str(r#"{"path":"a.bmp"}"#).unwrap();
        assert_eq!(q.path, "a.bmp");
        assert!(q.token.is_none());
    }
}
