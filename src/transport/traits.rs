use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::EndpointKey;
use crate::RawRecord;
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    /// Push subscription to every endpoint and configuration class. The
    /// receiver ends when the subscription is lost.
    async fn subscribe(&self) -> Result<mpsc::Receiver<RawRecord>>;

    /// Full state of one configuration class. Records carry no status.
    async fn fetch_class(
        &self,
        class: &str,
    ) -> Result<Vec<RawRecord>>;

    /// Full state of one endpoint on every node, including the
    /// rewrite-associations that target it. Records carry no status.
    async fn fetch_endpoint(
        &self,
        key: &EndpointKey,
    ) -> Result<Vec<RawRecord>>;
}
