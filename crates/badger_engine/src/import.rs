use std::sync::Arc;

use badger_core::{FailureKind, FetchFailure};
use badger_logging::{badger_debug, badger_info};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::{IMPORT_PATH, SIGN_PATH};
use crate::{DescriptorError, FetchDescriptor, Method, Transport};

const SIGN_FALLBACK: &str = "Unable to upload file. Please try again.";
const IMPORT_FALLBACK: &str = "Unable to import subscribers. Please try again.";

/// A CSV file to upload and import into the given segments.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub filename: String,
    pub content_type: String,
    pub contents: Bytes,
    pub segments: Vec<u64>,
}

/// Pre-signed object storage target returned by the sign endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignedUpload {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerMessage {
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{0}")]
    Sign(String),
    #[error("upload failed: {0}")]
    Upload(FetchFailure),
    #[error("{0}")]
    Import(String),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Sign, upload, then ask the server to import the uploaded file.
pub struct Importer {
    transport: Arc<dyn Transport>,
}

impl Importer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Returns the server's confirmation message.
    pub async fn import(&self, request: ImportRequest) -> Result<String, ImportError> {
        let sign = FetchDescriptor::post(SIGN_PATH)?.with_form([
            ("filename", request.filename.as_str()),
            ("contentType", request.content_type.as_str()),
            ("action", "import"),
        ]);
        let signed: SignedUpload = self
            .call(&sign)
            .await
            .map_err(|failure| ImportError::Sign(server_message(&failure, SIGN_FALLBACK)))?;
        badger_debug!("Signed upload target for {}", request.filename);

        let method = match signed.method.as_deref() {
            Some(raw) => raw.parse::<Method>()?,
            None => Method::Put,
        };
        let upload = FetchDescriptor::new(method, signed.url)?
            .with_body(request.contents.clone(), request.content_type.clone());
        self.transport
            .send(&upload)
            .await
            .and_then(|response| response.into_success())
            .map_err(ImportError::Upload)?;
        badger_info!(
            "Uploaded {} ({} bytes)",
            request.filename,
            request.contents.len()
        );

        let mut form = vec![("filename".to_string(), request.filename.clone())];
        form.extend(
            request
                .segments
                .iter()
                .map(|id| ("segments[]".to_string(), id.to_string())),
        );
        let import = FetchDescriptor::post(IMPORT_PATH)?.with_form(form);
        let confirmation: ServerMessage = self
            .call(&import)
            .await
            .map_err(|failure| ImportError::Import(server_message(&failure, IMPORT_FALLBACK)))?;
        Ok(confirmation.message)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        descriptor: &FetchDescriptor,
    ) -> Result<T, FetchFailure> {
        let body = self.transport.send(descriptor).await?.into_success()?;
        serde_json::from_slice(&body)
            .map_err(|err| FetchFailure::new(FailureKind::Decode, err.to_string()))
    }
}

/// The server's `message` if the failed response carried one, else `fallback`.
fn server_message(failure: &FetchFailure, fallback: &str) -> String {
    failure
        .body
        .as_deref()
        .and_then(|body| serde_json::from_str::<ServerMessage>(body).ok())
        .map(|parsed| parsed.message)
        .unwrap_or_else(|| fallback.to_string())
}
