use tokio::sync::mpsc;
use tokio::time::interval;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::Admission;
use super::LivenessMonitor;
use super::SessionTable;
use crate::metrics::JOBS_DISPATCHED;
use crate::metrics::JOBS_REJECTED;
use crate::metrics::WORKER_BACKLOG;
use crate::CapacityError;
use crate::Entity;
use crate::FabricContext;
use crate::Hello;
use crate::HelloReply;
use crate::Job;
use crate::JobAction;
use crate::JobDone;
use crate::PriorityMessage;
use crate::Result;
use crate::SystemError;
use crate::WatchMessage;
use crate::WorkerMessage;

/// Queues the dispatcher reads from.
pub struct DispatcherInbox {
    pub jobs: mpsc::Receiver<Job>,
    pub done: mpsc::UnboundedReceiver<JobDone>,
    pub hello: mpsc::UnboundedReceiver<HelloReply>,
}

/// Queues of every supervised task.
#[derive(Clone)]
pub struct DispatcherOutputs {
    pub workers: Vec<mpsc::UnboundedSender<WorkerMessage>>,
    pub priority: mpsc::UnboundedSender<PriorityMessage>,
    pub watch: mpsc::UnboundedSender<WatchMessage>,
}

pub struct Dispatcher {
    ctx: FabricContext,
    inbox: DispatcherInbox,
    outputs: DispatcherOutputs,
    sessions: SessionTable,
    liveness: LivenessMonitor,
    seq: u64,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        ctx: FabricContext,
        inbox: DispatcherInbox,
        outputs: DispatcherOutputs,
        cancel: CancellationToken,
    ) -> Self {
        let config = &ctx.settings.dispatcher;
        let sessions = SessionTable::new(
            outputs.workers.len(),
            config.max_jobs,
            config.max_key_count,
            config.key_failure_threshold,
        );
        let entities = (0..outputs.workers.len())
            .map(Entity::Worker)
            .chain([Entity::Priority, Entity::Watcher]);
        let liveness = LivenessMonitor::new(entities, config.hello_timeout(), Instant::now());
        Self {
            ctx,
            inbox,
            outputs,
            sessions,
            liveness,
            seq: 0,
            cancel,
        }
    }

    /// Routes jobs until cancelled or the job queue closes.
    ///
    /// Pool-wide backlog exhaustion and liveness timeouts are returned as
    /// errors; everything else is handled in place.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "[{}] dispatcher started with {} workers",
            self.ctx.fabric,
            self.outputs.workers.len()
        );
        let mut hello_tick = interval(self.ctx.settings.dispatcher.hello_interval());
        hello_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("[{}] dispatcher cancelled", self.ctx.fabric);
                    return Ok(());
                }
                Some(done) = self.inbox.done.recv() => {
                    self.sessions.complete(&done);
                    self.report_backlog(done.worker);
                }
                Some(reply) = self.inbox.hello.recv() => {
                    self.liveness.record(&reply, Instant::now());
                }
                _ = hello_tick.tick() => {
                    self.liveness.check(Instant::now())?;
                    self.send_hellos()?;
                }
                job = self.inbox.jobs.recv() => {
                    let Some(job) = job else {
                        debug!("[{}] job queue closed", self.ctx.fabric);
                        return Ok(());
                    };
                    self.dispatch(job)?;
                }
            }
        }
    }

    fn dispatch(
        &mut self,
        mut job: Job,
    ) -> Result<()> {
        match self.sessions.admit(&job.key)? {
            Admission::Assigned(worker) => {
                job.session = self.sessions.generation(&job.key).unwrap_or_default();
                JOBS_DISPATCHED
                    .with_label_values(&[self.ctx.fabric.as_str(), job.action.as_str()])
                    .inc();
                trace!(key = %job.key, worker, action = job.action.as_str(), "dispatch");
                self.send_job(worker, job)?;
            }
            Admission::Throttled { worker, outstanding } => {
                JOBS_REJECTED.with_label_values(&[self.ctx.fabric.as_str()]).inc();
                let e = CapacityError::KeyBacklog {
                    key: job.key.clone(),
                    outstanding,
                };
                warn!(worker, ts = job.ts, "dropping {} job: {}", job.action.as_str(), e);
            }
            Admission::Escalate { worker, attempts } => {
                JOBS_REJECTED.with_label_values(&[self.ctx.fabric.as_str()]).inc();
                warn!(
                    key = %job.key,
                    worker,
                    attempts,
                    "key backlog overflowed repeatedly, dropping its session"
                );
                let failure = Job {
                    key: job.key,
                    ts: job.ts,
                    action: JobAction::KeyFailure { attempts },
                    session: 0,
                };
                self.send_job(worker, failure)?;
            }
        }
        Ok(())
    }

    fn send_job(
        &self,
        worker: usize,
        job: Job,
    ) -> Result<()> {
        let tx = self
            .outputs
            .workers
            .get(worker)
            .ok_or_else(|| SystemError::SignalSendFailed(format!("no worker {worker}")))?;
        tx.send(WorkerMessage::Job(job))
            .map_err(|e| SystemError::SignalSendFailed(format!("worker-{worker}: {e}")))?;
        self.report_backlog(worker);
        Ok(())
    }

    fn send_hellos(&mut self) -> Result<()> {
        self.seq += 1;
        let hello = Hello {
            seq: self.seq,
            sent_at: Instant::now(),
        };
        for (id, tx) in self.outputs.workers.iter().enumerate() {
            tx.send(WorkerMessage::Hello(hello))
                .map_err(|e| SystemError::SignalSendFailed(format!("hello to worker-{id}: {e}")))?;
        }
        self.outputs
            .priority
            .send(PriorityMessage::Hello(hello))
            .map_err(|e| SystemError::SignalSendFailed(format!("hello to priority: {e}")))?;
        self.outputs
            .watch
            .send(WatchMessage::Hello(hello))
            .map_err(|e| SystemError::SignalSendFailed(format!("hello to watcher: {e}")))?;
        trace!("hello {} sent", self.seq);
        Ok(())
    }

    fn report_backlog(
        &self,
        worker: usize,
    ) {
        WORKER_BACKLOG
            .with_label_values(&[self.ctx.fabric.as_str(), &worker.to_string()])
            .set(self.sessions.load(worker) as i64);
    }
}
