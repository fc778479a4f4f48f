//! Badger engine: transport, race-safe fetching and job polling.
pub mod api;
mod client;
mod descriptor;
mod fetch;
mod import;
mod poller;
mod transport;

pub use badger_core::{
    FailureKind, FetchFailure, FetchState, JobHandle, JobId, JobOutcome, PollError, PollJob,
    PollPhase,
};
pub use client::DashboardClient;
pub use descriptor::{DescriptorError, FetchDescriptor, Method};
pub use fetch::{FetchPrimitive, FetchTicket, Settled};
pub use import::{ImportError, ImportRequest, Importer, SignedUpload};
pub use poller::{JobCanceller, JobEndpoints, JobPoller, JobTicket, PollerSettings};
pub use transport::{ReqwestTransport, Transport, TransportResponse, TransportSettings};
