//! WDI CamLink - inspection console camera service
//!
//! Main entry point.

use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wdi_camlink::{
    camera_backend::BackendRegistry,
    camera_client::HttpCameraTransport,
    settings::{EnvSettings, SettingsProvider},
    state::{AppConfig, AppState},
    web_api,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wdi_camlink=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting WDI CamLink v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        file_endpoint = %config.file_endpoint,
        data_root = %config.data_root,
        image_root = %config.image_root,
        default_camera_type = %config.default_camera_type,
        max_poll_retries = config.max_poll_retries,
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        "Configuration loaded"
    );

    let registry = Arc::new(BackendRegistry::from_env());
    for backend in registry.all() {
        tracing::info!(
            camera_type = %backend.camera_type,
            base_url = %backend.base_url,
            poll_interval_ms = backend.poll_interval_ms,
            "Camera backend registered"
        );
    }

    let transport = Arc::new(HttpCameraTransport::new(config.request_timeout)?);
    let settings = Arc::new(EnvSettings::from_env());
    if settings.debug_mode_enabled() {
        tracing::info!(
            show_debug_panel = settings.show_debug_panel(),
            "Debug mode enabled"
        );
    }

    let state = AppState::build(config, registry, transport, settings);
    tracing::info!("CameraController initialized");

    let app = web_api::create_router(state.clone())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Release the camera backend before exiting
    state.camera.stop().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
