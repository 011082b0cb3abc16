//! Camera backend type definitions

use crate::camera_error::CameraError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported camera integrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    /// Line-scan/area industrial camera behind the inspection service
    Industrial,
    /// Generic webcam
    Webcam,
    /// USB camera
    Usb,
}

impl CameraType {
    pub const ALL: [CameraType; 3] = [CameraType::Industrial, CameraType::Webcam, CameraType::Usb];

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraType::Industrial => "industrial",
            CameraType::Webcam => "webcam",
            CameraType::Usb => "usb",
        }
    }

    /// Environment variable prefix for overrides
    pub(crate) fn env_prefix(&self) -> &'static str {
        match self {
            CameraType::Industrial => "INDUSTRIAL_CAMERA",
            CameraType::Webcam => "WEBCAM",
            CameraType::Usb => "USB_CAMERA",
        }
    }
}

impl fmt::Display for CameraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraType {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "industrial" => Ok(CameraType::Industrial),
            "webcam" => Ok(CameraType::Webcam),
            "usb" => Ok(CameraType::Usb),
            other => Err(CameraError::configuration(format!(
                "Unknown camera type: {}",
                other
            ))),
        }
    }
}

/// Backend operation, one per named endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Connect,
    Disconnect,
    Start,
    Stop,
    Snapshot,
    IsConnected,
    Save,
    ListCameras,
    SetCameraIndex,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Connect => "connect",
            Endpoint::Disconnect => "disconnect",
            Endpoint::Start => "start",
            Endpoint::Stop => "stop",
            Endpoint::Snapshot => "snapshot",
            Endpoint::IsConnected => "isConnected",
            Endpoint::Save => "save",
            Endpoint::ListCameras => "listCameras",
            Endpoint::SetCameraIndex => "setCameraIndex",
        }
    }

    /// Read-only endpoints are fetched with GET, everything else is POST
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Endpoint::Snapshot | Endpoint::IsConnected | Endpoint::ListCameras
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint paths relative to the backend base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSet {
    pub connect: String,
    pub disconnect: String,
    pub start: String,
    pub stop: String,
    pub snapshot: String,
    pub is_connected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_cameras: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_camera_index: Option<String>,
}

impl EndpointSet {
    /// Lifecycle endpoints only
    pub fn basic() -> Self {
        Self {
            connect: "/connect".to_string(),
            disconnect: "/disconnect".to_string(),
            start: "/start".to_string(),
            stop: "/stop".to_string(),
            snapshot: "/snapshot".to_string(),
            is_connected: "/status".to_string(),
            save: None,
            list_cameras: None,
            set_camera_index: None,
        }
    }

    /// Lifecycle endpoints plus save/list/set-index
    pub fn with_device_control() -> Self {
        Self {
            save: Some("/save".to_string()),
            list_cameras: Some("/list".to_string()),
            set_camera_index: Some("/set-index".to_string()),
            ..Self::basic()
        }
    }

    pub fn path(&self, endpoint: Endpoint) -> Option<&str> {
        match endpoint {
            Endpoint::Connect => Some(&self.connect),
            Endpoint::Disconnect => Some(&self.disconnect),
            Endpoint::Start => Some(&self.start),
            Endpoint::Stop => Some(&self.stop),
            Endpoint::Snapshot => Some(&self.snapshot),
            Endpoint::IsConnected => Some(&self.is_connected),
            Endpoint::Save => self.save.as_deref(),
            Endpoint::ListCameras => self.list_cameras.as_deref(),
            Endpoint::SetCameraIndex => self.set_camera_index.as_deref(),
        }
    }
}

/// Media request for browser-style capture devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facing_mode: Option<String>,
}

/// Preferred constraints and the fallback tried when the device rejects them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaProfile {
    pub preferred: MediaConstraints,
    pub fallback: MediaConstraints,
}

impl Default for MediaProfile {
    fn default() -> Self {
        Self {
            preferred: MediaConstraints {
                width: 1920,
                height: 1080,
                frame_rate: 30,
                facing_mode: Some("environment".to_string()),
            },
            fallback: MediaConstraints {
                width: 1280,
                height: 720,
                frame_rate: 15,
                facing_mode: None,
            },
        }
    }
}

/// Per camera type backend configuration. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendConfig {
    pub camera_type: CameraType,
    pub base_url: String,
    pub endpoints: EndpointSet,
    pub poll_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaProfile>,
}

impl BackendConfig {
    /// Full URL for an endpoint, `None` when the backend does not offer it
    pub fn url(&self, endpoint: Endpoint) -> Option<String> {
        self.endpoints
            .path(endpoint)
            .map(|path| format!("{}{}", self.base_url.trim_end_matches('/'), path))
    }

    pub fn supports(&self, endpoint: Endpoint) -> bool {
        self.endpoints.path(endpoint).is_some()
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}
