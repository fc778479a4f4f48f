//! Dashboard endpoints and their wire shapes.

use badger_core::JobHandle;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::{DescriptorError, FetchDescriptor, JobEndpoints};

pub const EXPORT_PATH: &str = "/api/subscribers/export";
pub const EXPORT_DOWNLOAD_PATH: &str = "/api/subscribers/export/download";
pub const SIGN_PATH: &str = "/api/s3/sign";
pub const IMPORT_PATH: &str = "/api/subscribers/import";

/// Response of a start-job call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStarted {
    pub file_name: String,
}

/// Success body of a job status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReady {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Failed,
    Pending,
    #[serde(other)]
    Unknown,
}

/// Body of a non-success status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusBody {
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// One page of a cursor-paginated collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub collection: Vec<T>,
    #[serde(default)]
    pub links: Links,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            collection: Vec::new(),
            links: Links::default(),
        }
    }
}

impl<T> Page<T> {
    pub fn next_descriptor(&self) -> Option<Result<FetchDescriptor, DescriptorError>> {
        self.links.next.as_deref().map(FetchDescriptor::get)
    }

    pub fn previous_descriptor(&self) -> Option<Result<FetchDescriptor, DescriptorError>> {
        self.links.previous.as_deref().map(FetchDescriptor::get)
    }
}

/// `GET <collection>?per_page=<n>`.
pub fn list_descriptor(collection: &str, per_page: u32) -> Result<FetchDescriptor, DescriptorError> {
    let separator = if collection.contains('?') { '&' } else { '?' };
    FetchDescriptor::get(format!("{collection}{separator}per_page={per_page}"))
}

/// The subscribers export job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportJob;

impl JobEndpoints for ExportJob {
    fn start(&self) -> Result<FetchDescriptor, DescriptorError> {
        FetchDescriptor::post(EXPORT_PATH)
    }

    fn status(&self, handle: &JobHandle) -> Result<FetchDescriptor, DescriptorError> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("filename", handle.as_str())
            .finish();
        FetchDescriptor::get(format!("{EXPORT_DOWNLOAD_PATH}?{query}"))
    }
}
