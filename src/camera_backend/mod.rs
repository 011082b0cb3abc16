//! CameraBackend - Backend Registry
//!
//! ## Responsibilities
//!
//! - Fixed table of the three camera integrations (industrial, webcam, usb)
//! - Endpoint set, poll interval and media constraints per integration
//! - Built once at startup from the environment, read-only afterwards

mod types;

pub use types::*;

use crate::camera_error::CameraError;

/// Default base for all camera services
const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

/// Lower bound for configured poll intervals
const MIN_POLL_INTERVAL_MS: u64 = 20;

/// Backend registry: one immutable config per camera type
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    industrial: BackendConfig,
    webcam: BackendConfig,
    usb: BackendConfig,
}

impl BackendRegistry {
    /// Registry with the built-in defaults
    pub fn with_defaults() -> Self {
        Self {
            industrial: BackendConfig {
                camera_type: CameraType::Industrial,
                base_url: format!("{}/camera", DEFAULT_API_BASE),
                endpoints: EndpointSet::basic(),
                poll_interval_ms: 200,
                media: None,
            },
            webcam: BackendConfig {
                camera_type: CameraType::Webcam,
                base_url: format!("{}/webcam", DEFAULT_API_BASE),
                endpoints: EndpointSet::with_device_control(),
                poll_interval_ms: 100,
                media: Some(MediaProfile::default()),
            },
            usb: BackendConfig {
                camera_type: CameraType::Usb,
                base_url: format!("{}/usb-camera", DEFAULT_API_BASE),
                endpoints: EndpointSet::with_device_control(),
                poll_interval_ms: 100,
                media: Some(MediaProfile::default()),
            },
        }
    }

    /// Registry with defaults overridden by `<PREFIX>_URL` and
    /// `<PREFIX>_POLL_INTERVAL_MS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Registry built from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut registry = Self::with_defaults();

        for camera_type in CameraType::ALL {
            let prefix = camera_type.env_prefix();
            let config = registry.slot_mut(camera_type);

            if let Some(url) = lookup(&format!("{}_URL", prefix)) {
                let url = url.trim().trim_end_matches('/').to_string();
                if !url.is_empty() {
                    config.base_url = url;
                }
            }

            if let Some(raw) = lookup(&format!("{}_POLL_INTERVAL_MS", prefix)) {
                match raw.trim().parse::<u64>() {
                    Ok(ms) => config.poll_interval_ms = ms.max(MIN_POLL_INTERVAL_MS),
                    Err(_) => {
                        tracing::warn!(
                            camera_type = %camera_type,
                            value = %raw,
                            "Invalid poll interval override, keeping default"
                        );
                    }
                }
            }
        }

        registry
    }

    fn slot_mut(&mut self, camera_type: CameraType) -> &mut BackendConfig {
        match camera_type {
            CameraType::Industrial => &mut self.industrial,
            CameraType::Webcam => &mut self.webcam,
            CameraType::Usb => &mut self.usb,
        }
    }

    /// Config for a camera type. Always the same reference for a registry.
    pub fn config_for(&self, camera_type: CameraType) -> &BackendConfig {
        match camera_type {
            CameraType::Industrial => &self.industrial,
            CameraType::Webcam => &self.webcam,
            CameraType::Usb => &self.usb,
        }
    }

    /// Config by type name; unknown names are a configuration error
    pub fn config_for_name(&self, name: &str) -> Result<&BackendConfig, CameraError> {
        let camera_type: CameraType = name.parse()?;
        Ok(self.config_for(camera_type))
    }

    pub fn all(&self) -> [&BackendConfig; 3] {
        [&self.industrial, &self.webcam, &self.usb]
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
