use std::time::Duration;

use badger_core::{FailureKind, FetchFailure};
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::{FetchDescriptor, Method};

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Raw outcome of one network call. Non-success statuses are still responses here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body of a 2xx response, or an `HttpStatus` failure carrying the body.
    pub fn into_success(self) -> Result<Bytes, FetchFailure> {
        if self.is_success() {
            return Ok(self.body);
        }
        let reason = reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("unexpected status");
        Err(
            FetchFailure::new(FailureKind::HttpStatus(self.status), reason)
                .with_body(String::from_utf8_lossy(&self.body).into_owned()),
        )
    }
}

/// The single seam through which every component talks to the network.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, descriptor: &FetchDescriptor) -> Result<TransportResponse, FetchFailure>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: Url,
    settings: TransportSettings,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(base_url: Url, settings: TransportSettings) -> Result<Self, FetchFailure> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchFailure::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            base_url,
            settings,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn too_large(&self, actual: u64) -> FetchFailure {
        FetchFailure::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, descriptor: &FetchDescriptor) -> Result<TransportResponse, FetchFailure> {
        let url = descriptor
            .resolve(&self.base_url)
            .map_err(|err| FetchFailure::new(FailureKind::InvalidTarget, err.to_string()))?;

        let mut request = self.client.request(map_method(descriptor.method()), url);
        if let Some(body) = descriptor.body() {
            request = request.body(body.clone());
        }
        if let Some(content_type) = descriptor.content_type() {
            request = request.header(CONTENT_TYPE, content_type);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(TransportResponse::new(status, bytes))
    }
}

fn map_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        return FetchFailure::new(FailureKind::Timeout, err.to_string());
    }
    FetchFailure::new(FailureKind::Network, err.to_string())
}
