use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::FabricContext;
use super::FabricHandle;
use crate::async_task::spawn_task;
use crate::async_task::with_timeout;
use crate::constants::HANDLE_QUEUE_CAPACITY;
use crate::constants::JOB_QUEUE_CAPACITY;
use crate::metrics::PARSE_FAILURES;
use crate::metrics::TASK_RESTARTS;
use crate::parse_config;
use crate::parse_event;
use crate::ConfigClass;
use crate::Dispatcher;
use crate::DispatcherInbox;
use crate::DispatcherOutputs;
use crate::Error;
use crate::EventTransport;
use crate::Job;
use crate::NotificationSink;
use crate::PriorityMessage;
use crate::PriorityWorker;
use crate::RawRecord;
use crate::RecordKind;
use crate::RemediationExecutor;
use crate::Result;
use crate::Settings;
use crate::Stores;
use crate::SystemError;
use crate::TransportError;
use crate::Watcher;
use crate::Worker;
use crate::WorkerLinks;

/// Reloads settings before each restart.
pub type SettingsLoader = Box<dyn Fn() -> Result<Settings> + Send + Sync>;

/// Senders the ingestion loop feeds during one run.
struct Ingress {
    jobs: mpsc::Sender<Job>,
    priority: mpsc::UnboundedSender<PriorityMessage>,
}

/// Owns the lifecycle of one fabric.
///
/// Each run spawns the dispatcher, the pool workers, the priority worker and
/// the watcher, replays the configuration, then feeds the subscription into
/// them. Any task failure cancels the whole run; the task then backs off,
/// reloads its settings and starts over until shutdown is signalled.
pub struct FabricTask {
    settings: Arc<Settings>,
    loader: SettingsLoader,
    stores: Stores,
    transport: Arc<dyn EventTransport>,
    remediation: Arc<dyn RemediationExecutor>,
    notifier: Arc<dyn NotificationSink>,
    shutdown_signal: watch::Receiver<()>,
    handle_tx: mpsc::Sender<Job>,
    handle_rx: mpsc::Receiver<Job>,
}

impl FabricTask {
    pub fn new(
        settings: Settings,
        stores: Stores,
        transport: Arc<dyn EventTransport>,
        remediation: Arc<dyn RemediationExecutor>,
        notifier: Arc<dyn NotificationSink>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        let (handle_tx, handle_rx) = mpsc::channel(HANDLE_QUEUE_CAPACITY);
        Self {
            settings: Arc::new(settings),
            loader: Box::new(|| Settings::new()?.validate()),
            stores,
            transport,
            remediation,
            notifier,
            shutdown_signal,
            handle_tx,
            handle_rx,
        }
    }

    pub fn with_settings_loader(
        mut self,
        loader: SettingsLoader,
    ) -> Self {
        self.loader = loader;
        self
    }

    pub fn handle(&self) -> FabricHandle {
        FabricHandle::new(self.settings.fabric.name.clone(), self.handle_tx.clone())
    }

    /// Runs until shutdown, restarting after every failed run.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let fabric = self.settings.fabric.name.clone();
            match self.run_once().await {
                Ok(()) => {
                    info!("[{}] fabric task stopped", fabric);
                    return Ok(());
                }
                Err(e) => {
                    TASK_RESTARTS.with_label_values(&[fabric.as_str()]).inc();
                    error!("[{}] fabric task failed: {}", fabric, e);
                }
            }

            let backoff = self.settings.dispatcher.restart_backoff();
            tokio::select! {
                _ = self.shutdown_signal.changed() => {
                    info!("[{}] shutdown during restart backoff", fabric);
                    return Ok(());
                }
                _ = sleep(backoff) => {}
            }
            match (self.loader)() {
                Ok(settings) => self.settings = Arc::new(settings),
                Err(e) => warn!("[{}] settings reload failed, keeping previous: {}", fabric, e),
            }
            info!("[{}] restarting fabric task", self.settings.fabric.name);
        }
    }

    /// One run. `Ok` only when shutdown was signalled.
    async fn run_once(&mut self) -> Result<()> {
        let ctx = FabricContext::new(
            self.settings.clone(),
            &self.stores,
            self.transport.clone(),
            self.remediation.clone(),
            self.notifier.clone(),
        );
        let cancel = CancellationToken::new();
        let mut handles = Vec::new();
        let ingress = spawn_pipeline(&ctx, &cancel, &mut handles);
        info!("[{}] fabric task started", ctx.fabric);

        let result = self.ingest(&ctx, &ingress, &cancel).await;
        cancel.cancel();
        drop(ingress);

        let mut first_error = None;
        for joined in join_all(handles).await {
            if let Err(e) = joined.map_err(Error::from).and_then(|r| r) {
                first_error.get_or_insert(e);
            }
        }
        match (result, first_error) {
            (Ok(true), _) => Ok(()),
            (Err(e), _) => Err(e),
            (Ok(false), Some(e)) => Err(e),
            (Ok(false), None) => Err(Error::Fatal("fabric task cancelled".to_string())),
        }
    }

    /// Initial build and subscription loop. Returns `true` on shutdown and
    /// `false` when a supervised task cancelled the run.
    async fn ingest(
        &mut self,
        ctx: &FabricContext,
        ingress: &Ingress,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let deadline = ctx.settings.dispatcher.refresh_timeout();
        for class in ConfigClass::ALL {
            let records = with_timeout("initial build", deadline, ctx.transport.fetch_class(class.as_class())).await?;
            debug!("[{}] initial build: {} {} objects", ctx.fabric, records.len(), class);
            for record in records {
                route(ctx, ingress, record).await?;
            }
        }

        let mut records = ctx.transport.subscribe().await?;
        info!("[{}] subscribed", ctx.fabric);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_signal.changed() => {
                    info!("[{}] shutdown signal received", ctx.fabric);
                    return Ok(true);
                }
                _ = cancel.cancelled() => {
                    return Ok(false);
                }
                Some(job) = self.handle_rx.recv() => {
                    ingress.jobs
                        .send(job)
                        .await
                        .map_err(|e| SystemError::SignalSendFailed(format!("handle request: {e}")))?;
                }
                record = records.recv() => {
                    match record {
                        Some(record) => route(ctx, ingress, record).await?,
                        None => return Err(TransportError::SubscriptionClosed.into()),
                    }
                }
            }
        }
    }
}

/// Spawns every supervised task of one run and returns the ingestion
/// senders.
fn spawn_pipeline(
    ctx: &FabricContext,
    cancel: &CancellationToken,
    handles: &mut Vec<JoinHandle<Result<()>>>,
) -> Ingress {
    let workers = ctx.settings.dispatcher.workers;
    let (job_tx, jobs) = mpsc::channel(JOB_QUEUE_CAPACITY);
    let (done_tx, done) = mpsc::unbounded_channel();
    let (hello_tx, hello) = mpsc::unbounded_channel();
    let (priority_tx, priority_rx) = mpsc::unbounded_channel();
    let (watch_tx, watch_rx) = mpsc::unbounded_channel();

    let links = WorkerLinks {
        done: done_tx,
        hello: hello_tx.clone(),
        watch: watch_tx.clone(),
    };
    let mut worker_txs = Vec::with_capacity(workers);
    for id in 0..workers {
        let (tx, rx) = mpsc::unbounded_channel();
        worker_txs.push(tx);
        let worker = Worker::new(id, ctx.clone(), rx, links.clone(), cancel.clone());
        supervise(&format!("worker-{id}"), cancel, worker.run(), handles);
    }

    let priority = PriorityWorker::new(
        ctx.clone(),
        priority_rx,
        worker_txs.clone(),
        watch_tx.clone(),
        hello_tx.clone(),
        cancel.clone(),
    );
    supervise("priority", cancel, priority.run(), handles);

    let watcher = Watcher::new(ctx.clone(), watch_rx, hello_tx, job_tx.clone(), cancel.clone());
    supervise("watcher", cancel, watcher.run(), handles);

    let dispatcher = Dispatcher::new(
        ctx.clone(),
        DispatcherInbox { jobs, done, hello },
        DispatcherOutputs {
            workers: worker_txs,
            priority: priority_tx.clone(),
            watch: watch_tx,
        },
        cancel.clone(),
    );
    supervise("dispatcher", cancel, dispatcher.run(), handles);

    Ingress {
        jobs: job_tx,
        priority: priority_tx,
    }
}

/// Spawns `task`; its failure cancels every other task of the run.
fn supervise<F>(
    name: &str,
    cancel: &CancellationToken,
    task: F,
    handles: &mut Vec<JoinHandle<Result<()>>>,
) where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let cancel = cancel.clone();
    spawn_task(
        name,
        move || async move {
            let r = task.await;
            if r.is_err() {
                cancel.cancel();
            }
            r
        },
        Some(handles),
    );
}

/// Sends endpoint records to the dispatcher and configuration records to
/// the priority worker. Unparseable records are counted and dropped.
async fn route(
    ctx: &FabricContext,
    ingress: &Ingress,
    record: RawRecord,
) -> Result<()> {
    match record.kind() {
        RecordKind::Endpoint => match parse_event(&record, &ctx.fabric, ctx.settings.fabric.overlay_vnid) {
            Ok(event) => {
                ingress
                    .jobs
                    .send(Job::analyze(event))
                    .await
                    .map_err(|e| SystemError::SignalSendFailed(format!("endpoint job: {e}")))?;
            }
            Err(e) => dropped(ctx, &record, e),
        },
        RecordKind::Config(_) => match parse_config(&record) {
            Ok(object) => {
                ingress
                    .priority
                    .send(PriorityMessage::Config(object))
                    .map_err(|e| SystemError::SignalSendFailed(format!("config object: {e}")))?;
            }
            Err(e) => dropped(ctx, &record, e),
        },
        RecordKind::Unknown => trace!("[{}] ignoring {} record", ctx.fabric, record.class),
    }
    Ok(())
}

fn dropped(
    ctx: &FabricContext,
    record: &RawRecord,
    e: Error,
) {
    PARSE_FAILURES
        .with_label_values(&[ctx.fabric.as_str(), record.class.as_str()])
        .inc();
    debug!("[{}] dropped {} record: {}", ctx.fabric, record.class, e);
}
