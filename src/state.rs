//! Application state
//!
//! Holds all shared components and state

use crate::camera_backend::{BackendRegistry, CameraType};
use crate::camera_client::CameraTransport;
use crate::camera_link::{CameraController, ControllerConfig};
use crate::image_path::{
    PathResolver, ResolutionCache, ResolutionCacheConfig, ResolverConfig, SharedResolutionCache,
};
use crate::settings::SettingsProvider;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// File-serving endpoint used in resolved image URLs
    pub file_endpoint: String,
    /// Root served by the file endpoint
    pub data_root: String,
    /// Root of inspection images
    pub image_root: String,
    /// ResolutionCache capacity
    pub resolution_cache_capacity: usize,
    /// Poll failures tolerated before the controller enters `error`
    pub max_poll_retries: u32,
    /// Per-request timeout towards camera backends
    pub request_timeout: Duration,
    /// Camera type selected at startup
    pub default_camera_type: CameraType,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl AppConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolver = ResolverConfig::default();
        let cache = ResolutionCacheConfig::default();
        let controller = ControllerConfig::default();

        let default_camera_type = match lookup("DEFAULT_CAMERA_TYPE") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
                tracing::warn!(value = %raw, error = %e, "Invalid DEFAULT_CAMERA_TYPE, using industrial");
                controller.initial_camera_type
            }),
            None => controller.initial_camera_type,
        };

        Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            file_endpoint: lookup("FILE_ENDPOINT").unwrap_or(resolver.file_endpoint),
            data_root: lookup("DATA_ROOT").unwrap_or(resolver.data_root),
            image_root: lookup("IMAGE_ROOT").unwrap_or(resolver.image_root),
            resolution_cache_capacity: lookup("RESOLUTION_CACHE_CAPACITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(cache.capacity),
            max_poll_retries: lookup("CAMERA_MAX_POLL_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(controller.max_poll_retries),
            request_timeout: lookup("CAMERA_REQUEST_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_secs(10)),
            default_camera_type,
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            file_endpoint: self.file_endpoint.clone(),
            data_root: self.data_root.clone(),
            image_root: self.image_root.clone(),
            ..ResolverConfig::default()
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            max_poll_retries: self.max_poll_retries,
            initial_camera_type: self.default_camera_type,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Backend registry (immutable after startup)
    pub registry: Arc<BackendRegistry>,
    /// CameraController (connectivity + polling)
    pub camera: Arc<CameraController>,
    /// ResolutionCache (image path → URL)
    pub image_paths: Arc<SharedResolutionCache>,
    /// Console settings
    pub settings: Arc<dyn SettingsProvider>,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl AppState {
    /// Wire all components around the given transport and settings
    pub fn build(
        config: AppConfig,
        registry: Arc<BackendRegistry>,
        transport: Arc<dyn CameraTransport>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        let camera = Arc::new(CameraController::new(
            registry.clone(),
            transport,
            config.controller_config(),
        ));

        let cache = ResolutionCache::new(
            PathResolver::new(config.resolver_config()),
            ResolutionCacheConfig {
                capacity: config.resolution_cache_capacity,
                ..ResolutionCacheConfig::default()
            },
        );

        Self {
            config,
            registry,
            camera,
            image_paths: Arc::new(SharedResolutionCache::new(cache)),
            settings,
            started_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_lookup() {
        let config = AppConfig::from_lookup(|k| match k {
            "PORT" => Some("9090".into()),
            "DEFAULT_CAMERA_TYPE" => Some("usb".into()),
            "CAMERA_MAX_POLL_RETRIES" => Some("8".into()),
            "IMAGE_ROOT" => Some("/srv/images".into()),
            _ => None,
        });
        assert_eq!(config.port, 9090);
        assert_eq!(config.default_camera_type, CameraType::Usb);
        assert_eq!(config.controller_config().max_poll_retries, 8);
        assert_eq!(config.resolver_config().image_root, "/srv/images");
        assert_eq!(config.resolver_config().convert_format, "jpg");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_camera_type_falls_back() {
        let config = AppConfig::from_lookup(|k| match k {
            "DEFAULT_CAMERA_TYPE" => Some("thermal".into()),
            _ => None,
        });
        assert_eq!(config.default_camera_type, CameraType::Industrial);
        assert_eq!(config.resolution_cache_capacity, 1000);
    }
}
