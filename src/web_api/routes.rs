//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;

use crate::camera_backend::CameraType;
use crate::camera_client::DeviceInfo;
use crate::camera_link::SurfaceSnapshot;
use crate::error::{Error, Result};
use crate::models::{
    ApiResponse, DebugSettingsResponse, ResolveImageQuery, ResolveImageResponse,
    SelectCameraTypeRequest, SetCameraIndexRequest,
};
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Camera lifecycle
        .route("/api/camera/state", get(get_camera_state))
        .route("/api/camera/type", post(select_camera_type))
        .route("/api/camera/start", post(start_camera))
        .route("/api/camera/stop", post(stop_camera))
        .route("/api/camera/clear-error", post(clear_camera_error))
        // Frames
        .route("/api/camera/frame/latest", get(latest_frame))
        .route("/api/camera/ws", get(websocket_handler))
        // Device control
        .route("/api/camera/connected", get(camera_connected))
        .route("/api/camera/devices", get(list_devices))
        .route("/api/camera/index", post(set_camera_index))
        .route("/api/camera/save", post(save_frame))
        // Image paths
        .route("/api/images/resolve", get(resolve_image))
        // Debug
        .route("/api/debug/settings", get(debug_settings))
        .with_state(state)
}

// ========================================
// Camera lifecycle
// ========================================

async fn get_camera_state(State(state): State<AppState>) -> Json<ApiResponse<SurfaceSnapshot>> {
    Json(ApiResponse::success(state.camera.snapshot()))
}

async fn select_camera_type(
    State(state): State<AppState>,
    Json(req): Json<SelectCameraTypeRequest>,
) -> Result<Json<ApiResponse<SurfaceSnapshot>>> {
    let camera_type: CameraType = req
        .camera_type
        .parse()
        .map_err(|e: crate::camera_error::CameraError| Error::Validation(e.message))?;

    state.camera.select_camera_type(camera_type).await?;
    Ok(Json(ApiResponse::success(state.camera.snapshot())))
}

async fn start_camera(State(state): State<AppState>) -> Json<ApiResponse<SurfaceSnapshot>> {
    state.camera.start().await;
    Json(ApiResponse::success(state.camera.snapshot()))
}

async fn stop_camera(State(state): State<AppState>) -> Json<ApiResponse<SurfaceSnapshot>> {
    state.camera.stop().await;
    Json(ApiResponse::success(state.camera.snapshot()))
}

async fn clear_camera_error(State(state): State<AppState>) -> Json<ApiResponse<SurfaceSnapshot>> {
    state.camera.clear_error().await;
    Json(ApiResponse::success(state.camera.snapshot()))
}

// ========================================
// Frames
// ========================================

/// Latest frame bytes as delivered by the backend
async fn latest_frame(State(state): State<AppState>) -> Result<Response> {
    let frame = state
        .camera
        .snapshot()
        .frame
        .ok_or_else(|| Error::NotFound("No frame available".to_string()))?;

    let content_type = frame
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        frame.data,
    )
        .into_response())
}

// ========================================
// Device control
// ========================================

async fn camera_connected(State(state): State<AppState>) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let connected = state.camera.check_connection().await?;
    Ok(Json(ApiResponse::success(json!({ "connected": connected }))))
}

async fn list_devices(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<DeviceInfo>>>> {
    let devices = state.camera.list_cameras().await?;
    Ok(Json(ApiResponse::success(devices)))
}

async fn set_camera_index(
    State(state): State<AppState>,
    Json(req): Json<SetCameraIndexRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    state.camera.set_camera_index(req.index).await?;
    Ok(Json(ApiResponse::success(json!({ "index": req.index }))))
}

async fn save_frame(State(state): State<AppState>) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let path = state.camera.save_frame().await?;
    Ok(Json(ApiResponse::success(json!({ "path": path }))))
}

// ========================================
// Image paths
// ========================================

async fn resolve_image(
    State(state): State<AppState>,
    Query(query): Query<ResolveImageQuery>,
) -> Result<Json<ApiResponse<ResolveImageResponse>>> {
    if query.path.trim().is_empty() {
        return Err(Error::Validation("path must not be empty".to_string()));
    }

    let url = state
        .image_paths
        .get(&query.path, query.token.as_deref());

    Ok(Json(ApiResponse::success(ResolveImageResponse {
        path: query.path,
        url,
    })))
}

// ========================================
// Debug
// ========================================

async fn debug_settings(State(state): State<AppState>) -> Result<Json<ApiResponse<DebugSettingsResponse>>> {
    if !state.settings.debug_mode_enabled() {
        return Err(Error::NotFound("Debug mode is disabled".to_string()));
    }

    Ok(Json(ApiResponse::success(DebugSettingsResponse {
        debug_mode: true,
        show_debug_panel: state.settings.show_debug_panel(),
        max_poll_retries: state.camera.max_poll_retries(),
        resolution_cache: state.image_paths.stats(),
    })))
}

// ========================================
// WebSocket Handler
// ========================================

/// WebSocket upgrade handler
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Push the surface snapshot on every change
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut surface = state.camera.surface();
    let conn_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(connection_id = %conn_id, "WebSocket client connected");

    let send_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        let mut next = Some(surface.snapshot());
        while let Some(snapshot) = next {
            let text = match serde_json::to_string(&snapshot) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(connection_id = %send_id, error = %e, "Failed to encode surface snapshot");
                    break;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
            next = surface.changed().await;
        }
    });

    let recv_id = conn_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::info!(connection_id = %recv_id, "WebSocket client disconnected");
                    break;
                }
                Err(e) => {
                    tracing::warn!(connection_id = %recv_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!(connection_id = %conn_id, "WebSocket session closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_backend::BackendRegistry;
    use crate::camera_client::{BackendResponse, CameraTransport};
    use crate::camera_backend::{BackendConfig, Endpoint};
    use crate::camera_error::CameraFailure;
    use crate::settings::EnvSettings;
    use crate::state::AppConfig;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct UnreachableTransport;

    #[async_trait]
    impl CameraTransport for UnreachableTransport {
        async fn send(
            &self,
            _config: &BackendConfig,
            _endpoint: Endpoint,
            _payload: Option<serde_json::Value>,
        ) -> std::result::Result<BackendResponse, CameraFailure> {
            Err(CameraFailure::Transport {
                message: "connection refused".into(),
                timeout: false,
            })
        }
    }

    fn app_state(debug: bool) -> AppState {
        AppState::build(
            AppConfig::from_lookup(|_| None),
            Arc::new(BackendRegistry::with_defaults()),
            Arc::new(UnreachableTransport),
            Arc::new(EnvSettings::new(debug, debug)),
        )
    }

    #[tokio::test]
    async fn test_resolve_image_through_cache() {
        let state = app_state(false);
        let query = ResolveImageQuery {
            path: "C:\\captures\\inspection\\20240101_1200\\img.bmp".to_string(),
            token: None,
        };
        let Json(body) = resolve_image(State(state.clone()), Query(query.clone()))
            .await
            .unwrap();
        let url = body.data.unwrap().url;
        assert!(url.contains("inspection/20240101_1200/img.bmp"));
        assert!(url.contains("convert=jpg"));

        let Json(again) = resolve_image(State(state.clone()), Query(query)).await.unwrap();
        assert_eq!(again.data.unwrap().url, url);
        let stats = state.image_paths.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_path() {
        let query = ResolveImageQuery {
            path: "  ".to_string(),
            token: None,
        };
        let err = resolve_image(State(app_state(false)), Query(query))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_debug_settings_hidden_unless_enabled() {
        let err = debug_settings(State(app_state(false))).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let Json(body) = debug_settings(State(app_state(true))).await.unwrap();
        let data = body.data.unwrap();
        assert!(data.show_debug_panel);
        assert_eq!(data.max_poll_retries, 5);
    }

    #[tokio::test]
    async fn test_unknown_camera_type_is_validation_error() {
        let req = SelectCameraTypeRequest {
            camera_type: "thermal".to_string(),
        };
        let err = select_camera_type(State(app_state(false)), Json(req))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_start_against_unreachable_backend_reports_error_state() {
        let state = app_state(false);
        let Json(body) = start_camera(State(state.clone())).await;
        let snapshot = body.data.unwrap();
        assert_eq!(snapshot.state, crate::camera_link::ConnectionState::Error);
        assert!(!snapshot.network.is_online);

        assert!(matches!(
            latest_frame(State(state)).await,
            Err(Error::NotFound(_))
        ));
    }
}
