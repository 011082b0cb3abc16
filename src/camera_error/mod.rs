//! Camera error classification
//!
//! ## Responsibilities
//!
//! - Map every raw backend failure to exactly one [`ErrorKind`]
//! - Decide retry eligibility for the polling loop
//!
//! Classification is pure; callers own the resulting [`CameraError`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum body length carried into `CameraError::details`
const MAX_DETAIL_LEN: usize = 256;

/// Markers in backend bodies/messages that indicate a device or hardware fault
const HARDWARE_MARKERS: &[&str] = &[
    "device not found",
    "camera not found",
    "no camera",
    "not connected",
    "hardware",
    "device busy",
    "grab failed",
];

/// Markers in opaque messages that indicate a transport problem
const NETWORK_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "connection refused",
    "connection reset",
    "network",
    "failed to fetch",
    "dns",
];

/// Markers in opaque messages that indicate a configuration problem
const CONFIG_MARKERS: &[&str] = &["config", "unsupported camera type", "unknown camera type"];

/// Error kind taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Hardware,
    Configuration,
    Api,
    Unknown,
}

impl ErrorKind {
    /// Transient failures expected to clear on their own
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Api)
    }

    /// Ends polling on first occurrence. `Unknown` is not fatal; it counts
    /// against the retry threshold like a transient failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::Hardware | ErrorKind::Configuration)
    }

    /// Stable code used in API error bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorKind::Network => "CAMERA_NETWORK_ERROR",
            ErrorKind::Hardware => "CAMERA_HARDWARE_ERROR",
            ErrorKind::Configuration => "CAMERA_CONFIG_ERROR",
            ErrorKind::Api => "CAMERA_API_ERROR",
            ErrorKind::Unknown => "CAMERA_UNKNOWN_ERROR",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Hardware => "hardware",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Api => "api",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified camera failure, as shown on the connection banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CameraError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "[{}] {} ({})", self.kind, self.message, details),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for CameraError {}

/// Raw failure as observed at the camera transport boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraFailure {
    /// Request never produced a response (connect/DNS/reset/timeout)
    Transport { message: String, timeout: bool },
    /// Backend answered with a non-success status
    Status { status: u16, body: String },
    /// Local configuration problem (missing endpoint, unknown type)
    Configuration(String),
    /// Anything else (decode failures, unexpected payloads)
    Other(String),
}

impl fmt::Display for CameraFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraFailure::Transport { message, timeout } => {
                if *timeout {
                    write!(f, "request timed out: {}", message)
                } else {
                    write!(f, "transport error: {}", message)
                }
            }
            CameraFailure::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            CameraFailure::Configuration(msg) => write!(f, "configuration error: {}", msg),
            CameraFailure::Other(msg) => f.write_str(msg),
        }
    }
}

impl From<reqwest::Error> for CameraFailure {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return CameraFailure::Status {
                status: status.as_u16(),
                body: e.to_string(),
            };
        }
        if e.is_timeout() || e.is_connect() || e.is_request() {
            return CameraFailure::Transport {
                message: e.to_string(),
                timeout: e.is_timeout(),
            };
        }
        CameraFailure::Other(e.to_string())
    }
}

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    let lower = haystack.to_ascii_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// Hardware fault codes reported by the camera services, e.g. `HW_TIMEOUT`
fn has_hardware_code(text: &str) -> bool {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token.starts_with("HW_") && token.len() > 3)
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_DETAIL_LEN {
        return body.to_string();
    }
    let mut end = MAX_DETAIL_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

/// Pull a human readable message out of a JSON error body, if any
fn body_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Classify a raw failure. Total: every input maps to exactly one kind.
pub fn classify(failure: &CameraFailure) -> CameraError {
    match failure {
        CameraFailure::Transport { message, timeout } => {
            let text = if *timeout {
                "Camera request timed out"
            } else {
                "Camera backend unreachable"
            };
            CameraError::new(ErrorKind::Network, text).with_details(message.clone())
        }
        CameraFailure::Status { status, body } => {
            let message = body_message(body)
                .unwrap_or_else(|| format!("Camera backend returned HTTP {}", status));
            let details = format!("HTTP {}: {}", status, truncate(body));
            // Gateway timeouts are transport failures reported by a proxy
            if *status == 504 {
                return CameraError::new(ErrorKind::Network, message).with_details(details);
            }
            if contains_any(body, HARDWARE_MARKERS) || has_hardware_code(body) {
                return CameraError::new(ErrorKind::Hardware, message).with_details(details);
            }
            CameraError::new(ErrorKind::Api, message).with_details(details)
        }
        CameraFailure::Configuration(msg) => CameraError::configuration(msg.clone()),
        CameraFailure::Other(msg) => {
            let kind = if contains_any(msg, NETWORK_MARKERS) {
                ErrorKind::Network
            } else if contains_any(msg, HARDWARE_MARKERS) || has_hardware_code(msg) {
                ErrorKind::Hardware
            } else if contains_any(msg, CONFIG_MARKERS) {
                ErrorKind::Configuration
            } else {
                ErrorKind::Unknown
            };
            CameraError::new(kind, msg.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, body: &str) -> CameraFailure {
        CameraFailure::Status {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_transport_is_network() {
        let err = classify(&CameraFailure::Transport {
            message: "connection refused".into(),
            timeout: false,
        });
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(err.is_retryable());

        let err = classify(&CameraFailure::Transport {
            message: "deadline".into(),
            timeout: true,
        });
        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(err.message, "Camera request timed out");
    }

    #[test]
    fn test_device_not_found_is_hardware() {
        let err = classify(&status(500, r#"{"error":"Camera not found at index 2"}"#));
        assert_eq!(err.kind, ErrorKind::Hardware);
        assert_eq!(err.message, "Camera not found at index 2");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_hardware_fault_code() {
        let err = classify(&status(503, r#"{"code":"HW_SENSOR_FAULT"}"#));
        assert_eq!(err.kind, ErrorKind::Hardware);
        // A bare prefix is not a code
        let err = classify(&status(503, "HW_"));
        assert_eq!(err.kind, ErrorKind::Api);
    }

    #[test]
    fn test_plain_status_is_api() {
        let err = classify(&status(400, r#"{"message":"bad exposure value"}"#));
        assert_eq!(err.kind, ErrorKind::Api);
        assert_eq!(err.message, "bad exposure value");
        assert_eq!(
            err.details.as_deref(),
            Some(r#"HTTP 400: {"message":"bad exposure value"}"#)
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_gateway_timeout_is_network() {
        let err = classify(&status(504, "upstream timed out"));
        assert_eq!(err.kind, ErrorKind::Network);
    }

    #[test]
    fn test_configuration() {
        let err = classify(&CameraFailure::Configuration("no save endpoint".into()));
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(!err.is_retryable());

        let err = classify(&CameraFailure::Other("unknown camera type: ir".into()));
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_other_messages() {
        assert_eq!(
            classify(&CameraFailure::Other("operation timed out".into())).kind,
            ErrorKind::Network
        );
        assert_eq!(
            classify(&CameraFailure::Other("Device busy".into())).kind,
            ErrorKind::Hardware
        );
        let err = classify(&CameraFailure::Other("invalid jpeg header".into()));
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_long_body_truncated() {
        let body = "x".repeat(1000);
        let err = classify(&status(500, &body));
        let details = err.details.unwrap();
        assert!(details.len() < 300);
        assert!(details.ends_with('…'));
    }

    #[test]
    fn test_serialized_shape() {
        let err = CameraError::new(ErrorKind::Api, "boom").with_details("HTTP 500");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "api");
        assert_eq!(json["message"], "boom");
        assert_eq!(json["details"], "HTTP 500");
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(ErrorKind::Hardware.is_fatal());
        assert!(ErrorKind::Configuration.is_fatal());
        assert!(!ErrorKind::Unknown.is_fatal());
        assert!(!ErrorKind::Network.is_fatal());
        assert!(!ErrorKind::Api.is_fatal());
    }
}
