use std::sync::Arc;

use badger_core::FetchFailure;
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::ExportJob;
use crate::{
    FetchPrimitive, Importer, JobPoller, PollerSettings, ReqwestTransport, Transport,
    TransportSettings,
};

/// Hands one injected transport to every component built from it.
#[derive(Clone)]
pub struct DashboardClient {
    transport: Arc<dyn Transport>,
}

impl DashboardClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn connect(base_url: Url, settings: TransportSettings) -> Result<Self, FetchFailure> {
        let transport = ReqwestTransport::new(base_url, settings)?;
        Ok(Self::new(Arc::new(transport)))
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub fn fetcher<T>(&self, initial: T) -> FetchPrimitive<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        FetchPrimitive::new(self.transport.clone(), initial)
    }

    pub fn export_poller(&self, settings: PollerSettings) -> JobPoller<ExportJob> {
        JobPoller::new(self.transport.clone(), ExportJob, settings)
    }

    pub fn importer(&self) -> Importer {
        Importer::new(self.transport.clone())
    }
}
