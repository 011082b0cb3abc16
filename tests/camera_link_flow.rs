//! End-to-end flow through the public controller and image path APIs

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wdi_camlink::camera_backend::{BackendConfig, BackendRegistry, CameraType, Endpoint};
use wdi_camlink::camera_client::{BackendResponse, CameraTransport};
use wdi_camlink::camera_error::{CameraFailure, ErrorKind};
use wdi_camlink::camera_link::{CameraController, ConnectionState, ControllerConfig};
use wdi_camlink::image_path::{PathResolver, ResolutionCache, ResolutionCacheConfig, ResolverConfig};

/// Healthy backend that can be taken offline
#[derive(Default)]
struct FakeBackend {
    offline: Mutex<bool>,
    calls: Mutex<Vec<(CameraType, Endpoint)>>,
}

impl FakeBackend {
    fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    fn calls(&self) -> Vec<(CameraType, Endpoint)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CameraTransport for FakeBackend {
    async fn send(
        &self,
        config: &BackendConfig,
        endpoint: Endpoint,
        _payload: Option<serde_json::Value>,
    ) -> Result<BackendResponse, CameraFailure> {
        self.calls.lock().unwrap().push((config.camera_type, endpoint));
        if *self.offline.lock().unwrap() {
            return Err(CameraFailure::Transport {
                message: "connection refused".into(),
                timeout: false,
            });
        }
        match endpoint {
            Endpoint::Snapshot => Ok(BackendResponse::new(vec![0u8; 16]).with_content_type("image/jpeg")),
            _ => Ok(BackendResponse::new(r#"{"success":true}"#)),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_with_outage_and_type_switch() {
    let backend = Arc::new(FakeBackend::default());
    let controller = CameraController::new(
        Arc::new(BackendRegistry::with_defaults()),
        backend.clone(),
        ControllerConfig {
            max_poll_retries: 2,
            initial_camera_type: CameraType::Industrial,
        },
    );
    let mut surface = controller.surface();

    controller.start().await;
    assert_eq!(surface.state(), ConnectionState::Polling);

    // Industrial polls every 200ms; first tick fires immediately
    tokio::time::sleep(Duration::from_millis(500)).await;
    let frame = surface.latest_frame().expect("frame delivered");
    assert_eq!(frame.sequence, 3);
    assert_eq!(frame.content_type.as_deref(), Some("image/jpeg"));

    // Outage: three failed ticks exceed two tolerated retries
    backend.set_offline(true);
    let snapshot = loop {
        let snapshot = surface.changed().await.expect("controller alive");
        if snapshot.state == ConnectionState::Error {
            break snapshot;
        }
    };
    assert_eq!(snapshot.network.retry_count, 3);
    assert!(!snapshot.network.is_online);
    assert_eq!(snapshot.error.map(|e| e.kind), Some(ErrorKind::Network));

    // Switching type from error tears down the industrial backend
    backend.set_offline(false);
    controller
        .select_camera_type(CameraType::Usb)
        .await
        .expect("switch allowed from error");
    let calls = backend.calls();
    let tail = &calls[calls.len() - 2..];
    assert_eq!(
        tail,
        &[
            (CameraType::Industrial, Endpoint::Stop),
            (CameraType::Industrial, Endpoint::Disconnect)
        ]
    );

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.camera_type, CameraType::Usb);
    assert_eq!(snapshot.state, ConnectionState::Disconnected);
    assert!(snapshot.frame.is_none());
    assert!(snapshot.network.is_online);

    controller.start().await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(surface.latest_frame().map(|f| f.sequence), Some(2));

    controller.stop().await;
    assert_eq!(surface.state(), ConnectionState::Disconnected);
    assert_eq!(
        backend.calls().last(),
        Some(&(CameraType::Usb, Endpoint::Disconnect))
    );
}

#[test]
fn test_resolution_cache_serves_inspection_urls() {
    let resolver = PathResolver::new(ResolverConfig {
        image_root: "/srv/wdi/images".to_string(),
        data_root: "/srv/wdi".to_string(),
        ..ResolverConfig::default()
    });
    let mut cache = ResolutionCache::new(
        resolver,
        ResolutionCacheConfig {
            capacity: 10,
            evict_percent: 20,
        },
    );

    let url = cache.get("D:\\line2\\20240101_1200\\img.bmp", Some("42"));
    assert!(url.starts_with("/api/files?path="));
    assert!(url.contains("inspection/20240101_1200/img.bmp"));
    assert!(url.ends_with("&convert=jpg&t=42"));
    assert_eq!(cache.get("D:\\line2\\20240101_1200\\img.bmp", Some("42")), url);

    for i in 0..11 {
        cache.get(&format!("/srv/wdi/exports/{}.png", i), None);
    }
    let stats = cache.stats();
    assert!(stats.entries <= 10);
    assert!(stats.evicted >= 2);
    assert_eq!(stats.hits, 1);
}
