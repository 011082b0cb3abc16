//! CameraLink - Connectivity Controller
//!
//! ## Responsibilities
//!
//! - Drive connect → start → poll → stop/disconnect against the selected backend
//! - Classify failures into `CameraError` and keep `NetworkStatus` accounting
//! - Detect dropped frames from gaps in the poll tick sequence
//! - Publish state to the [`FrameDeliverySurface`]
//!
//! ## Concurrency
//!
//! - Connect/start/type switch are serialized by the lifecycle lock
//! - Stop bumps the session generation first, so late responses and an
//!   in-flight connect/start are dropped, then tears down under the lifecycle
//!   lock so a following start never overlaps the old teardown
//! - One poll task per session; at most one snapshot request in flight, ticks
//!   that fire while it is outstanding are skipped

mod surface;
mod types;


pub use surface::{FrameDeliverySurface, SurfaceSnapshot};
pub use types::*;

use crate::camera_backend::{BackendRegistry, CameraType, Endpoint, MediaProfile};
use crate::camera_client::{parse_connected, parse_devices, BackendResponse, CameraTransport, DeviceInfo};
use crate::camera_error::{classify, CameraError, CameraFailure, ErrorKind};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Authoritative controller state
struct Session {
    camera_type: CameraType,
    state: ConnectionState,
    /// Whether `connected` had been reached when the last error was entered
    connected_before_error: bool,
    /// Bumped whenever in-flight responses must be ignored
    generation: u64,
    network: NetworkStatus,
    error: Option<CameraError>,
    frame: Option<FrameSample>,
    dropped_frame: bool,
    /// Tick of the last delivered sample; 0 before the first (ticks start at 1)
    last_tick: u64,
    sequence: u64,
    poll_task: Option<JoinHandle<()>>,
}

impl Session {
    fn new(camera_type: CameraType) -> Self {
        Self {
            camera_type,
            state: ConnectionState::Disconnected,
            connected_before_error: false,
            generation: 0,
            network: NetworkStatus::default(),
            error: None,
            frame: None,
            dropped_frame: false,
            last_tick: 0,
            sequence: 0,
            poll_task: None,
        }
    }

    fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            camera_type: self.camera_type,
            state: self.state,
            frame: self.frame.clone(),
            dropped_frame: self.dropped_frame,
            error: self.error.clone(),
            network: self.network,
        }
    }

    /// Cancel polling and invalidate in-flight responses
    fn invalidate(&mut self) {
        self.generation += 1;
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    /// Back to `disconnected` with nothing retained
    fn reset(&mut self) {
        self.invalidate();
        self.state = ConnectionState::Disconnected;
        self.connected_before_error = false;
        self.network = NetworkStatus::default();
        self.error = None;
        self.frame = None;
        self.dropped_frame = false;
        self.last_tick = 0;
        self.sequence = 0;
    }

    fn enter_error(&mut self, error: CameraError) {
        self.connected_before_error = self.state.is_live();
        self.state = ConnectionState::Error;
        self.error = Some(error);
    }

    /// `error` → `connected` or `disconnected`, no retry
    fn leave_error(&mut self) {
        if self.state == ConnectionState::Error {
            self.state = if self.connected_before_error {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            };
        }
        self.error = None;
    }
}

struct Inner {
    registry: Arc<BackendRegistry>,
    transport: Arc<dyn CameraTransport>,
    config: ControllerConfig,
    session: Mutex<Session>,
    lifecycle: Mutex<()>,
    surface_tx: watch::Sender<SurfaceSnapshot>,
}

impl Inner {
    fn publish(&self, session: &Session) {
        self.surface_tx.send_replace(session.snapshot());
    }

    async fn call(
        &self,
        camera_type: CameraType,
        endpoint: Endpoint,
        payload: Option<serde_json::Value>,
    ) -> Result<BackendResponse, CameraFailure> {
        let config = self.registry.config_for(camera_type);
        self.transport.send(config, endpoint, payload).await
    }

    /// One attempt; failures are logged only
    async fn best_effort(&self, camera_type: CameraType, endpoint: Endpoint) {
        if let Err(failure) = self.call(camera_type, endpoint, None).await {
            tracing::warn!(
                camera_type = %camera_type,
                endpoint = %endpoint,
                error = %failure,
                "Camera teardown request failed"
            );
        }
    }

    async fn teardown_backend(&self, camera_type: CameraType, previous: ConnectionState) {
        if matches!(previous, ConnectionState::Polling | ConnectionState::Error) {
            self.best_effort(camera_type, Endpoint::Stop).await;
        }
        self.best_effort(camera_type, Endpoint::Disconnect).await;
    }

    /// Apply one snapshot response from poll tick `tick`
    async fn apply_snapshot(
        &self,
        generation: u64,
        tick: u64,
        result: Result<BackendResponse, CameraFailure>,
    ) {
        let mut s = self.session.lock().await;
        if s.generation != generation || s.state != ConnectionState::Polling {
            tracing::debug!(tick = tick, "Discarding stale snapshot response");
            return;
        }
        let camera_type = s.camera_type;

        match result {
            Ok(response) => {
                let prev = s.last_tick;
                let dropped = tick > prev + 1;
                if dropped {
                    tracing::debug!(
                        camera_type = %camera_type,
                        missed_ticks = tick - prev - 1,
                        "Dropped frame detected"
                    );
                }

                let sequence = s.sequence + 1;
                let frame = FrameSample {
                    sequence,
                    tick,
                    captured_at: Utc::now(),
                    content_type: response.content_type,
                    size_bytes: response.body.len(),
                    data: response.body,
                };

                s.sequence = sequence;
                s.last_tick = tick;
                s.dropped_frame = dropped;
                s.frame = Some(frame);
                s.network.record_success(camera_type);
            }
            Err(failure) => {
                let error = classify(&failure);
                s.network.record_failure(camera_type, &error);
                let retry_count = s.network.retry_count;

                if error.kind.is_fatal() || retry_count > self.config.max_poll_retries {
                    tracing::error!(
                        camera_type = %camera_type,
                        retry_count = retry_count,
                        error = %error,
                        "Snapshot polling stopped"
                    );
                    s.invalidate();
                    s.enter_error(error);
                } else {
                    tracing::warn!(
                        camera_type = %camera_type,
                        retry_count = retry_count,
                        error = %error,
                        "Snapshot failed, retrying on next tick"
                    );
                    s.error = Some(error);
                }
            }
        }

        self.publish(&s);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.session.get_mut().poll_task.take() {
            task.abort();
        }
    }
}

/// Periodic snapshot task bound to one session generation
async fn poll_loop(
    weak: Weak<Inner>,
    camera_type: CameraType,
    period: Duration,
    generation: u64,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let in_flight = Arc::new(AtomicBool::new(false));
    let mut tick: u64 = 0;

    loop {
        ticker.tick().await;
        tick += 1;

        let Some(inner) = weak.upgrade() else {
            break;
        };

        if in_flight.swap(true, Ordering::AcqRel) {
            tracing::trace!(
                camera_type = %camera_type,
                tick = tick,
                "Snapshot still in flight, skipping tick"
            );
            continue;
        }

        let in_flight = in_flight.clone();
        tokio::spawn(async move {
            let result = inner.call(camera_type, Endpoint::Snapshot, None).await;
            inner.apply_snapshot(generation, tick, result).await;
            in_flight.store(false, Ordering::Release);
        });
    }
}

/// Connectivity controller. Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct CameraController {
    inner: Arc<Inner>,
}

impl CameraController {
    pub fn new(
        registry: Arc<BackendRegistry>,
        transport: Arc<dyn CameraTransport>,
        config: ControllerConfig,
    ) -> Self {
        let session = Session::new(config.initial_camera_type);
        let (surface_tx, _) = watch::channel(session.snapshot());

        Self {
            inner: Arc::new(Inner {
                registry,
                transport,
                config,
                session: Mutex::new(session),
                lifecycle: Mutex::new(()),
                surface_tx,
            }),
        }
    }

    /// New subscriber onto the controller state
    pub fn surface(&self) -> FrameDeliverySurface {
        FrameDeliverySurface::new(self.inner.surface_tx.subscribe())
    }

    /// Current state copy
    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.inner.surface_tx.borrow().clone()
    }

    pub async fn camera_type(&self) -> CameraType {
        self.inner.session.lock().await.camera_type
    }

    pub fn max_poll_retries(&self) -> u32 {
        self.inner.config.max_poll_retries
    }

    /// Switch backend. Rejected while connecting or polling; from `connected`
    /// or `error` the previous backend is torn down first.
    pub async fn select_camera_type(&self, camera_type: CameraType) -> Result<(), CameraError> {
        let _guard = self.inner.lifecycle.try_lock().map_err(|_| {
            CameraError::configuration("Cannot switch camera type while the camera is connecting")
        })?;

        let (previous_type, previous_state) = {
            let mut s = self.inner.session.lock().await;
            if s.camera_type == camera_type {
                return Ok(());
            }
            if matches!(
                s.state,
                ConnectionState::Connecting | ConnectionState::Polling
            ) {
                return Err(CameraError::configuration(format!(
                    "Cannot switch camera type while {}; stop the camera first",
                    s.state
                )));
            }

            let previous = (s.camera_type, s.state);
            s.reset();
            self.inner.publish(&s);
            previous
        };

        if previous_state != ConnectionState::Disconnected {
            self.inner
                .teardown_backend(previous_type, previous_state)
                .await;
        }

        {
            let mut s = self.inner.session.lock().await;
            s.camera_type = camera_type;
            self.inner.publish(&s);
        }

        tracing::info!(
            from = %previous_type,
            to = %camera_type,
            "Camera type switched"
        );
        Ok(())
    }

    /// `disconnected`/`error` → `connecting` → `connected` or `error`
    pub async fn connect(&self) {
        let _guard = self.inner.lifecycle.lock().await;
        self.connect_locked().await;
    }

    async fn connect_locked(&self) {
        let (camera_type, generation) = {
            let mut s = self.inner.session.lock().await;
            if !matches!(
                s.state,
                ConnectionState::Disconnected | ConnectionState::Error
            ) {
                return;
            }
            s.state = ConnectionState::Connecting;
            s.error = None;
            self.inner.publish(&s);
            (s.camera_type, s.generation)
        };

        tracing::info!(camera_type = %camera_type, "Connecting camera");
        let result = self.inner.call(camera_type, Endpoint::Connect, None).await;

        let mut s = self.inner.session.lock().await;
        if s.generation != generation {
            drop(s);
            if result.is_ok() {
                tracing::debug!(
                    camera_type = %camera_type,
                    "Connect finished after teardown, releasing connection"
                );
                self.inner
                    .best_effort(camera_type, Endpoint::Disconnect)
                    .await;
            }
            return;
        }

        match result {
            Ok(_) => {
                s.state = ConnectionState::Connected;
                s.network.record_success(camera_type);
                tracing::info!(camera_type = %camera_type, "Camera connected");
            }
            Err(failure) => {
                let error = classify(&failure);
                tracing::warn!(
                    camera_type = %camera_type,
                    error = %error,
                    "Camera connect failed"
                );
                s.network.record_failure(camera_type, &error);
                s.enter_error(error);
            }
        }
        self.inner.publish(&s);
    }

    /// Start live polling, connecting first when needed. Invoked from
    /// `error`, the error is cleared as by [`Self::clear_error`] first.
    pub async fn start(&self) {
        let _guard = self.inner.lifecycle.lock().await;

        let state = {
            let mut s = self.inner.session.lock().await;
            if s.state == ConnectionState::Error {
                s.leave_error();
                self.inner.publish(&s);
            }
            s.state
        };

        match state {
            ConnectionState::Polling | ConnectionState::Connecting => return,
            ConnectionState::Disconnected => self.connect_locked().await,
            _ => {}
        }

        let (camera_type, generation) = {
            let s = self.inner.session.lock().await;
            if s.state != ConnectionState::Connected {
                return;
            }
            (s.camera_type, s.generation)
        };

        let result = self.inner.call(camera_type, Endpoint::Start, None).await;

        let mut s = self.inner.session.lock().await;
        if s.generation != generation {
            return;
        }

        if let Err(failure) = result {
            let error = classify(&failure);
            tracing::warn!(
                camera_type = %camera_type,
                error = %error,
                "Camera start failed"
            );
            s.network.record_failure(camera_type, &error);
            s.enter_error(error);
            self.inner.publish(&s);
            return;
        }

        let period = self.inner.registry.config_for(camera_type).poll_interval();
        s.state = ConnectionState::Polling;
        s.network.record_success(camera_type);
        s.last_tick = 0;
        s.dropped_frame = false;
        s.poll_task = Some(tokio::spawn(poll_loop(
            Arc::downgrade(&self.inner),
            camera_type,
            period,
            generation,
        )));
        self.inner.publish(&s);

        tracing::info!(
            camera_type = %camera_type,
            poll_interval_ms = period.as_millis() as u64,
            "Camera polling started"
        );
    }

    /// Any state → `disconnected`. Backend stop/disconnect are best-effort.
    pub async fn stop(&self) {
        // Invalidate first; an in-flight connect/start holds the lifecycle lock
        let (camera_type, previous) = {
            let mut s = self.inner.session.lock().await;
            let previous = s.state;
            s.reset();
            self.inner.publish(&s);
            (s.camera_type, previous)
        };

        if previous == ConnectionState::Disconnected {
            return;
        }

        let _guard = self.inner.lifecycle.lock().await;
        tracing::info!(
            camera_type = %camera_type,
            previous_state = %previous,
            "Camera stopped"
        );
        self.inner.teardown_backend(camera_type, previous).await;
    }

    /// Drop the current error. Never retries.
    pub async fn clear_error(&self) {
        let mut s = self.inner.session.lock().await;
        s.leave_error();
        self.inner.publish(&s);
    }

    /// Ask the backend whether the device is connected
    pub async fn check_connection(&self) -> Result<bool, CameraError> {
        let camera_type = self.camera_type().await;
        let result = self
            .inner
            .call(camera_type, Endpoint::IsConnected, None)
            .await
            .and_then(|r| parse_connected(&r));

        let mut s = self.inner.session.lock().await;
        let current = s.camera_type == camera_type;

        match result {
            Ok(connected) => {
                if current && !s.network.is_online {
                    s.network.is_online = true;
                    self.inner.publish(&s);
                }
                Ok(connected)
            }
            Err(failure) => {
                let error = classify(&failure);
                if current && error.kind == ErrorKind::Network && s.network.is_online {
                    s.network.is_online = false;
                    self.inner.publish(&s);
                }
                Err(error)
            }
        }
    }

    /// Ask the backend to persist the current frame; returns the saved path
    /// when the backend reports one
    pub async fn save_frame(&self) -> Result<Option<String>, CameraError> {
        let response = self.device_call(Endpoint::Save, None).await?;
        let saved = serde_json::from_slice::<serde_json::Value>(&response.body)
            .ok()
            .and_then(|v| {
                ["path", "filename", "file"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(|p| p.as_str()).map(str::to_string))
            });
        Ok(saved)
    }

    /// Capture devices known to the active backend
    pub async fn list_cameras(&self) -> Result<Vec<DeviceInfo>, CameraError> {
        let response = self.device_call(Endpoint::ListCameras, None).await?;
        parse_devices(&response).map_err(|f| classify(&f))
    }

    /// Select the capture device on the active backend
    pub async fn set_camera_index(&self, index: u32) -> Result<(), CameraError> {
        self.device_call(
            Endpoint::SetCameraIndex,
            Some(serde_json::json!({ "index": index })),
        )
        .await
        .map(|_| ())
    }

    /// Preferred/fallback constraints of the active backend
    pub async fn media_constraints(&self) -> Option<MediaProfile> {
        let camera_type = self.camera_type().await;
        self.inner.registry.config_for(camera_type).media.clone()
    }

    async fn device_call(
        &self,
        endpoint: Endpoint,
        payload: Option<serde_json::Value>,
    ) -> Result<BackendResponse, CameraError> {
        let camera_type = self.camera_type().await;
        if !self.inner.registry.config_for(camera_type).supports(endpoint) {
            return Err(CameraError::configuration(format!(
                "{} camera does not support {}",
                camera_type, endpoint
            )));
        }
        self.inner
            .call(camera_type, endpoint, payload)
            .await
            .map_err(|f| classify(&f))
    }
}
