//! Camera link type definitions

use crate::camera_backend::CameraType;
use crate::camera_error::{CameraError, ErrorKind};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection lifecycle state. Only the controller changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Polling,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Polling => "polling",
            ConnectionState::Error => "error",
        }
    }

    /// A live session exists against the backend
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Polling)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reachability of the active backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub is_online: bool,
    pub retry_count: u32,
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self {
            is_online: true,
            retry_count: 0,
        }
    }
}

impl NetworkStatus {
    /// First success after failures resets the counter
    pub fn record_success(&mut self, camera_type: CameraType) {
        if self.retry_count > 0 || !self.is_online {
            tracing::info!(
                camera_type = %camera_type,
                failed_attempts = self.retry_count,
                "Camera backend recovered"
            );
        }
        self.retry_count = 0;
        self.is_online = true;
    }

    /// Count a failed attempt; only transport failures mean offline
    pub fn record_failure(&mut self, camera_type: CameraType, error: &CameraError) {
        let was_online = self.is_online;
        self.retry_count = self.retry_count.saturating_add(1);
        self.is_online = error.kind != ErrorKind::Network;

        if was_online && !self.is_online {
            tracing::warn!(
                camera_type = %camera_type,
                error = %error,
                "Camera backend unreachable"
            );
        }
    }
}

/// One polled frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameSample {
    /// Count of delivered samples in this session, starting at 1
    pub sequence: u64,
    /// Poll tick the sample was requested on
    pub tick: u64,
    pub captured_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size_bytes: usize,
    #[serde(skip)]
    pub data: Bytes,
}

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Consecutive poll failures tolerated before entering `error`
    pub max_poll_retries: u32,
    /// Camera type selected at startup
    pub initial_camera_type: CameraType,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_poll_retries: 5,
            initial_camera_type: CameraType::Industrial,
        }
    }
}
