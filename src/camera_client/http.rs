//! HTTP transport for the camera backends

use super::{BackendResponse, CameraTransport};
use crate::camera_backend::{BackendConfig, Endpoint};
use crate::camera_error::CameraFailure;
use async_trait::async_trait;
use std::time::Duration;

/// Default request timeout
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// reqwest based transport
pub struct HttpCameraTransport {
    client: reqwest::Client,
}

impl HttpCameraTransport {
    /// Create transport with the given request timeout
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_defaults() -> crate::Result<Self> {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

#[async_trait]
impl CameraTransport for HttpCameraTransport {
    async fn send(
        &self,
        config: &BackendConfig,
        endpoint: Endpoint,
        payload: Option<serde_json::Value>,
    ) -> Result<BackendResponse, CameraFailure> {
        let url = config.url(endpoint).ok_or_else(|| {
            CameraFailure::Configuration(format!(
                "{} backend has no {} endpoint",
                config.camera_type, endpoint
            ))
        })?;

        let mut request = if endpoint.is_query() {
            self.client.get(&url)
        } else {
            self.client.post(&url)
        };
        if let Some(body) = payload {
            request = request.json(&body);
        }

        tracing::trace!(
            camera_type = %config.camera_type,
            endpoint = %endpoint,
            url = %url,
            "Camera backend request"
        );

        let resp = request.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CameraFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = resp.bytes().await?;

        Ok(BackendResponse { content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_backend::{BackendRegistry, CameraType};

    #[tokio::test]
    async fn test_missing_endpoint_fails_before_request() {
        let transport = HttpCameraTransport::with_defaults().unwrap();
        let registry = BackendRegistry::with_defaults();

        let err = transport
            .send(registry.config_for(CameraType::Industrial), Endpoint::Save, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CameraFailure::Configuration(_)));
    }
}
