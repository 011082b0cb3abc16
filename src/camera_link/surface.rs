//! Frame Delivery Surface
//!
//! Read-only projection of the controller state for the display layer.
//! The controller is the single writer; readers get snapshot copies.

use super::types::{ConnectionState, FrameSample, NetworkStatus};
use crate::camera_backend::CameraType;
use crate::camera_error::CameraError;
use serde::Serialize;
use tokio::sync::watch;

/// Everything the display layer renders
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceSnapshot {
    pub camera_type: CameraType,
    pub state: ConnectionState,
    pub frame: Option<FrameSample>,
    pub dropped_frame: bool,
    pub error: Option<CameraError>,
    pub network: NetworkStatus,
}

/// Subscriber handle onto the controller state
#[derive(Debug, Clone)]
pub struct FrameDeliverySurface {
    rx: watch::Receiver<SurfaceSnapshot>,
}

impl FrameDeliverySurface {
    pub(crate) fn new(rx: watch::Receiver<SurfaceSnapshot>) -> Self {
        Self { rx }
    }

    /// Current state copy
    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.rx.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.rx.borrow().state
    }

    pub fn latest_frame(&self) -> Option<FrameSample> {
        self.rx.borrow().frame.clone()
    }

    /// Wait for the next change. `None` once the controller is gone.
    pub async fn changed(&mut self) -> Option<SurfaceSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
