use tokio::sync::mpsc;

use crate::time::now_ts;
use crate::EndpointKey;
use crate::Job;
use crate::Result;
use crate::SystemError;

/// Submits out-of-band requests to a running fabric task.
#[derive(Debug, Clone)]
pub struct FabricHandle {
    fabric: String,
    tx: mpsc::Sender<Job>,
}

impl FabricHandle {
    pub(crate) fn new(
        fabric: String,
        tx: mpsc::Sender<Job>,
    ) -> Self {
        Self { fabric, tx }
    }

    pub fn fabric(&self) -> &str {
        &self.fabric
    }

    /// Re-fetches the full state of `key` from the transport.
    pub async fn refresh(
        &self,
        key: EndpointKey,
    ) -> Result<()> {
        self.submit(Job::refresh(key, now_ts())).await
    }

    /// Removes every history, anomaly and summary record of `key`.
    pub async fn delete_endpoint(
        &self,
        key: EndpointKey,
    ) -> Result<()> {
        self.submit(Job::delete_endpoint(key, now_ts())).await
    }

    async fn submit(
        &self,
        job: Job,
    ) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|e| SystemError::SignalSendFailed(format!("[{}] fabric task gone: {e}", self.fabric)))?;
        Ok(())
    }
}
