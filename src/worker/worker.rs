use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::analyze_key;
use crate::EndpointKey;
use crate::Entity;
use crate::Error;
use crate::FabricCache;
use crate::FabricContext;
use crate::HelloReply;
use crate::Job;
use crate::JobAction;
use crate::JobDone;
use crate::Notification;
use crate::Reconciler;
use crate::Result;
use crate::SystemError;
use crate::WatchMessage;
use crate::WorkerMessage;

/// Outbound queues of a pool worker.
#[derive(Clone)]
pub struct WorkerLinks {
    pub done: mpsc::UnboundedSender<JobDone>,
    pub hello: mpsc::UnboundedSender<HelloReply>,
    pub watch: mpsc::UnboundedSender<WatchMessage>,
}

pub struct Worker {
    id: usize,
    ctx: FabricContext,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
    links: WorkerLinks,
    cache: FabricCache,
    reconciler: Reconciler,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        id: usize,
        ctx: FabricContext,
        rx: mpsc::UnboundedReceiver<WorkerMessage>,
        links: WorkerLinks,
        cancel: CancellationToken,
    ) -> Self {
        let cache = FabricCache::new(&ctx.fabric, ctx.objects.clone(), ctx.settings.cache.capacity);
        let reconciler = Reconciler::new(ctx.history.clone(), ctx.settings.analysis.max_events_per_node);
        Self {
            id,
            ctx,
            rx,
            links,
            cache,
            reconciler,
            cancel,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("[{}] worker-{} started", self.ctx.fabric, self.id);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("[{}] worker-{} cancelled", self.ctx.fabric, self.id);
                    return Ok(());
                }
                msg = self.rx.recv() => {
                    let Some(msg) = msg else {
                        return Ok(());
                    };
                    self.handle_message(msg).await?;
                }
            }
        }
    }

    async fn handle_message(
        &mut self,
        msg: WorkerMessage,
    ) -> Result<()> {
        match msg {
            WorkerMessage::Job(job) => {
                let (key, session) = (job.key.clone(), job.session);
                let result = self.process(job).await;
                self.links
                    .done
                    .send(JobDone {
                        worker: self.id,
                        key: key.clone(),
                        session,
                    })
                    .map_err(|e| SystemError::SignalSendFailed(format!("job done: {e}")))?;
                match result {
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => warn!(key = %key, "worker-{} job failed: {}", self.id, e),
                    Ok(()) => {}
                }
            }
            WorkerMessage::Hello(hello) => {
                self.links
                    .hello
                    .send(HelloReply {
                        entity: Entity::Worker(self.id),
                        seq: hello.seq,
                    })
                    .map_err(|e| SystemError::SignalSendFailed(format!("hello reply: {e}")))?;
            }
            WorkerMessage::ClearCache(flush) => {
                trace!("worker-{} flush {:?}", self.id, flush);
                self.cache.flush(&flush);
            }
        }
        Ok(())
    }

    async fn process(
        &mut self,
        job: Job,
    ) -> Result<()> {
        let key = job.key;
        match job.action {
            JobAction::Analyze(event) => {
                let mut event = *event;
                self.cache.resolve_event(&mut event)?;
                if self.reconciler.merge(event)?.analyze {
                    self.analyze(&key)?;
                }
            }
            JobAction::Refresh => {
                let options = self.ctx.refresh_options();
                let refreshed = self
                    .reconciler
                    .refresh(self.ctx.transport.as_ref(), &mut self.cache, &key, job.ts, options)
                    .await;
                match refreshed {
                    Ok(outcome) if outcome.analyze => self.analyze(&key)?,
                    Ok(_) => {}
                    Err(Error::Reconcile(e)) => debug!("refresh skipped: {}", e),
                    Err(e) => return Err(e),
                }
            }
            JobAction::DeleteEndpoint => {
                let removed = self.ctx.history.delete_endpoint(&key)?;
                debug!(key = %key, removed, "endpoint deleted");
            }
            JobAction::KeyFailure { attempts } => {
                self.ctx.notifier.notify(Notification::key_failure(&key, attempts));
            }
        }
        Ok(())
    }

    fn analyze(
        &mut self,
        key: &EndpointKey,
    ) -> Result<()> {
        let outcome = analyze_key(
            self.ctx.history.as_ref(),
            &mut self.cache,
            key,
            &self.ctx.settings.analysis,
        )?;
        if let Some(delta) = outcome.moved {
            self.ctx.notifier.notify(Notification::moved(key, &delta));
        }
        for request in outcome.watch {
            self.links
                .watch
                .send(WatchMessage::Watch(request))
                .map_err(|e| SystemError::SignalSendFailed(format!("watch request: {e}")))?;
        }
        Ok(())
    }
}
