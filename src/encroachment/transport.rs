// src/encroachment/transport.rs
//
// The single network seam of the audit: one POST of an encoded image to the
// segmentation service. Status handling and retries live in `retry.rs`.

use crate::error::{AnalysisError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Raw HTTP outcome of one inference request.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

pub trait SegmentationTransport {
    /// Send `image` bytes and return the status and body. Only transport-level
    /// failures (timeout, refused connection, broken body) are errors.
    fn post(&self, image: &[u8]) -> impl Future<Output = Result<TransportResponse>> + Send;
}

pub struct HttpTransport {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(endpoint: String, api_key: String, timeout_secs: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SegmentationTransport for HttpTransport {
    fn post(&self, image: &[u8]) -> impl Future<Output = Result<TransportResponse>> + Send {
        let request = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(image.to_vec());

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| AnalysisError::Network(format!("Request failed: {}", e)))?;

            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|e| AnalysisError::Network(format!("Failed to read body: {}", e)))?
                .to_vec();

            debug!("Segmentation service answered {} ({} bytes)", status, body.len());
            Ok(TransportResponse { status, body })
        }
    }
}
