//! CameraClient - transport to the camera backends
//!
//! ## Responsibilities
//!
//! - Issue one backend operation per call (connect, snapshot, ...)
//! - Report failures as raw [`CameraFailure`] values for classification
//! - Decode the small JSON payloads of `isConnected` and `listCameras`
//!
//! The controller only talks to [`CameraTransport`], so tests can swap in a
//! scripted backend.

mod http;

pub use http::HttpCameraTransport;

use crate::camera_backend::{BackendConfig, Endpoint};
use crate::camera_error::CameraFailure;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Successful backend response
#[derive(Debug, Clone, Default)]
pub struct BackendResponse {
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    fn json(&self) -> Result<serde_json::Value, CameraFailure> {
        serde_json::from_slice(&self.body)
            .map_err(|e| CameraFailure::Other(format!("Invalid JSON from camera backend: {}", e)))
    }
}

/// Transport seam between the controller and a camera backend
#[async_trait]
pub trait CameraTransport: Send + Sync {
    /// Call `endpoint` on the backend described by `config`
    async fn send(
        &self,
        config: &BackendConfig,
        endpoint: Endpoint,
        payload: Option<serde_json::Value>,
    ) -> Result<BackendResponse, CameraFailure>;
}

/// Capture device as reported by `listCameras`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub index: u32,
    #[serde(default)]
    pub name: String,
}

/// Decode an `isConnected` answer: `{"connected": bool}` or a bare boolean
pub fn parse_connected(response: &BackendResponse) -> Result<bool, CameraFailure> {
    let value = response.json()?;
    if let Some(b) = value.as_bool() {
        return Ok(b);
    }
    ["connected", "isConnected", "is_connected"]
        .iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_bool()))
        .ok_or_else(|| {
            CameraFailure::Other(format!("Unexpected isConnected payload: {}", value))
        })
}

/// Decode a `listCameras` answer: an array or `{"cameras": [...]}`
pub fn parse_devices(response: &BackendResponse) -> Result<Vec<DeviceInfo>, CameraFailure> {
    let value = response.json()?;
    let list = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(mut map) => map
            .remove("cameras")
            .ok_or_else(|| CameraFailure::Other("listCameras payload has no cameras".into()))?,
        other => {
            return Err(CameraFailure::Other(format!(
                "Unexpected listCameras payload: {}",
                other
            )))
        }
    };
    serde_json::from_value(list)
        .map_err(|e| CameraFailure::Other(format!("Invalid camera list: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connected_forms() {
        assert!(parse_connected(&BackendResponse::new("true")).unwrap());
        assert!(!parse_connected(&BackendResponse::new(r#"{"connected":false}"#)).unwrap());
        assert!(parse_connected(&BackendResponse::new(r#"{"isConnected":true}"#)).unwrap());
        assert!(parse_connected(&BackendResponse::new(r#"{"status":"ok"}"#)).is_err());
        assert!(parse_connected(&BackendResponse::new("not json")).is_err());
    }

    #[test]
    fn test_parse_devices_forms() {
        let devices =
            parse_devices(&BackendResponse::new(r#"[{"index":0,"name":"Front"},{"index":1}]"#))
                .unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].name, "");

        let devices =
            parse_devices(&BackendResponse::new(r#"{"cameras":[{"index":2,"name":"Side"}]}"#))
                .unwrap();
        assert_eq!(devices, vec![DeviceInfo { index: 2, name: "Side".into() }]);

        assert!(parse_devices(&BackendResponse::new("42")).is_err());
    }
}
