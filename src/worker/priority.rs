use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::invalidations;
use crate::CacheFlush;
use crate::ConfigObject;
use crate::DependencyGraph;
use crate::Entity;
use crate::FabricContext;
use crate::FabricObject;
use crate::HelloReply;
use crate::PriorityMessage;
use crate::Result;
use crate::SystemError;
use crate::WatchMessage;
use crate::WorkerMessage;

/// Applies configuration changes ahead of endpoint jobs.
pub struct PriorityWorker {
    ctx: FabricContext,
    rx: mpsc::UnboundedReceiver<PriorityMessage>,
    workers: Vec<mpsc::UnboundedSender<WorkerMessage>>,
    watch_tx: mpsc::UnboundedSender<WatchMessage>,
    hello_tx: mpsc::UnboundedSender<HelloReply>,
    graph: DependencyGraph,
    cancel: CancellationToken,
}

impl PriorityWorker {
    pub fn new(
        ctx: FabricContext,
        rx: mpsc::UnboundedReceiver<PriorityMessage>,
        workers: Vec<mpsc::UnboundedSender<WorkerMessage>>,
        watch_tx: mpsc::UnboundedSender<WatchMessage>,
        hello_tx: mpsc::UnboundedSender<HelloReply>,
        cancel: CancellationToken,
    ) -> Self {
        let graph = DependencyGraph::new(ctx.objects.clone());
        Self {
            ctx,
            rx,
            workers,
            watch_tx,
            hello_tx,
            graph,
            cancel,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("[{}] priority worker started", self.ctx.fabric);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("[{}] priority worker cancelled", self.ctx.fabric);
                    return Ok(());
                }
                msg = self.rx.recv() => {
                    match msg {
                        Some(PriorityMessage::Config(object)) => self.apply(object)?,
                        Some(PriorityMessage::Hello(hello)) => {
                            self.hello_tx
                                .send(HelloReply { entity: Entity::Priority, seq: hello.seq })
                                .map_err(|e| SystemError::SignalSendFailed(format!("hello reply: {e}")))?;
                        }
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Syncs one object, then broadcasts the flushes its changes require and
    /// reports node state to the watcher.
    fn apply(
        &mut self,
        object: ConfigObject,
    ) -> Result<()> {
        let changes = match self.graph.sync(&self.ctx.fabric, &object) {
            Ok(changes) => changes,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("[{}] sync of {} failed: {}", self.ctx.fabric, object.dn, e);
                return Ok(());
            }
        };

        let mut flushes: Vec<CacheFlush> = Vec::new();
        for change in &changes {
            for flush in invalidations(change) {
                if !flushes.contains(&flush) {
                    flushes.push(flush);
                }
            }
            if let Some(FabricObject::Node(node)) = &change.object {
                self.watch_tx
                    .send(WatchMessage::NodeState {
                        node: node.id,
                        state: node.state,
                    })
                    .map_err(|e| SystemError::SignalSendFailed(format!("node state: {e}")))?;
            }
        }

        for flush in flushes {
            for (id, tx) in self.workers.iter().enumerate() {
                tx.send(WorkerMessage::ClearCache(flush.clone()))
                    .map_err(|e| SystemError::SignalSendFailed(format!("flush to worker-{id}: {e}")))?;
            }
        }
        Ok(())
    }
}
