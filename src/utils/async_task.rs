use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::error;
use tracing::warn;

use crate::Result;
use crate::TransportError;

/// Runs `task` under a deadline, mapping expiry to a transport timeout.
pub(crate) async fn with_timeout<T, F>(
    name: &str,
    deadline: Duration,
    task: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(deadline, task).await {
        Ok(r) => r,
        Err(_) => {
            warn!("{name} timed out after {:?}", deadline);
            Err(TransportError::Timeout(deadline).into())
        }
    }
}

// Helper function to spawn tasks and track their JoinHandles
pub(crate) fn spawn_task<F, Fut>(
    name: &str,
    task_fn: F,
    handles: Option<&mut Vec<JoinHandle<Result<()>>>>,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let name = name.to_string();
    let handle = tokio::spawn(async move {
        let r = task_fn().await;
        if let Err(e) = &r {
            error!("spawned task: {name} stopped or encountered an error: {:?}", e);
        }
        r
    });

    if let Some(h) = handles {
        h.push(handle);
    }
}
