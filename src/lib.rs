//! WDI CamLink Library
//!
//! Camera connectivity and image path service for the wood-defect
//! inspection console.
//!
//! ## Architecture (7 Components)
//!
//! 1. CameraError - failure taxonomy and classifier
//! 2. CameraBackend - per-type backend registry
//! 3. CameraClient - HTTP transport to the camera services
//! 4. CameraLink - connectivity controller and frame delivery surface
//! 5. ImagePath - path resolver and bounded resolution cache
//! 6. Settings - console debug flags
//! 7. WebAPI - REST/WebSocket endpoints
//!
//! ## Design Principles
//!
//! - The controller is the only writer of connection state
//! - Backend configs are immutable after startup
//! - Failures are values (`CameraError`) until they reach the HTTP surface

pub mod camera_backend;
pub mod camera_client;
pub mod camera_error;
pub mod camera_link;
pub mod image_path;
pub mod settings;
pub mod web_api;
pub mod models;
pub mod error;
pub mod state;

pub use error::{Error, Result};
pub use state::AppState;
