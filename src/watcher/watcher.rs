use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::time::sleep_until;
use tokio::time::timeout;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::watch_window;
use super::WatchTable;
use crate::metrics::ANOMALIES_CONFIRMED;
use crate::metrics::REMEDIATIONS;
use crate::time::now_ts;
use crate::AnomalyEvent;
use crate::ClearRequest;
use crate::EndpointKey;
use crate::Entity;
use crate::Event;
use crate::FabricContext;
use crate::HelloReply;
use crate::Job;
use crate::LedgerFlag;
use crate::NodeState;
use crate::Notification;
use crate::RemediationError;
use crate::RemediationOutcome;
use crate::Result;
use crate::SystemError;
use crate::WatchMessage;
use crate::WatchRequest;

/// Debounce watcher and node-state tracker of one fabric.
pub struct Watcher {
    ctx: FabricContext,
    rx: mpsc::UnboundedReceiver<WatchMessage>,
    hello_tx: mpsc::UnboundedSender<HelloReply>,
    job_tx: mpsc::Sender<Job>,
    table: WatchTable,
    nodes: HashMap<u32, NodeState>,
    cancel: CancellationToken,
}

impl Watcher {
    pub fn new(
        ctx: FabricContext,
        rx: mpsc::UnboundedReceiver<WatchMessage>,
        hello_tx: mpsc::UnboundedSender<HelloReply>,
        job_tx: mpsc::Sender<Job>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            rx,
            hello_tx,
            job_tx,
            table: WatchTable::new(),
            nodes: HashMap::new(),
            cancel,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("[{}] watcher started", self.ctx.fabric);
        loop {
            let deadline = self.table.next_deadline();
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("[{}] watcher cancelled with {} pending", self.ctx.fabric, self.table.len());
                    return Ok(());
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    for request in self.table.pop_expired(Instant::now()) {
                        if let Err(e) = self.confirm(request).await {
                            warn!("[{}] watch confirmation failed: {}", self.ctx.fabric, e);
                        }
                    }
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
        msg: WatchMessage,
    ) -> Result<()> {
        match msg {
            WatchMessage::Watch(request) => {
                let window = watch_window(&request, &self.ctx.settings.analysis);
                let key = request.key().clone();
                let node = request.node();
                if self.table.schedule(request, window, Instant::now()) {
                    trace!(key = %key, node, ?window, "watch scheduled");
                }
            }
            WatchMessage::NodeState { node, state } => {
                let previous = self.nodes.insert(node, state);
                if matches!(
                    (previous, state),
                    (Some(NodeState::Active), NodeState::Inactive) | (Some(NodeState::Inactive), NodeState::Active)
                ) {
                    self.rebuild_node(node, state).await?;
                }
            }
            WatchMessage::Hello(hello) => {
                self.hello_tx
                    .send(HelloReply {
                        entity: Entity::Watcher,
                        seq: hello.seq,
                    })
                    .map_err(|e| SystemError::SignalSendFailed(format!("hello reply: {e}")))?;
            }
        }
        Ok(())
    }

    /// Queues a refresh of every key with history on `node`.
    async fn rebuild_node(
        &self,
        node: u32,
        state: NodeState,
    ) -> Result<()> {
        let keys = self.ctx.history.keys_on_node(&self.ctx.fabric, node)?;
        info!(
            "[{}] node {} is now {:?}, refreshing {} keys",
            self.ctx.fabric,
            node,
            state,
            keys.len()
        );
        let ts = now_ts();
        for key in keys {
            self.job_tx
                .send(Job::refresh(key, ts))
                .await
                .map_err(|e| SystemError::SignalSendFailed(format!("node rebuild: {e}")))?;
        }
        Ok(())
    }

    /// Persists and reports `request` if its ledger flag survived the
    /// debounce window.
    async fn confirm(
        &self,
        request: WatchRequest,
    ) -> Result<()> {
        let (flag, auto_clear) = match &request {
            WatchRequest::Stale { .. } => (LedgerFlag::Stale, self.ctx.settings.remediation.auto_clear_stale),
            WatchRequest::OffSubnet { .. } => (
                LedgerFlag::OffSubnet,
                self.ctx.settings.remediation.auto_clear_offsubnet,
            ),
        };
        let key = request.key();
        let node = request.node();
        let still_set = self
            .ctx
            .history
            .read_latest(key, Some(node), 1)?
            .first()
            .map(|l| l.flag(flag))
            .unwrap_or(false);
        if !still_set {
            debug!(key = %key, node, kind = %request.kind(), "transient anomaly dropped");
            return Ok(());
        }

        let (anomaly, notification, event) = match &request {
            WatchRequest::Stale { key, snapshot } => (
                AnomalyEvent::Stale(snapshot.clone()),
                Notification::stale(key, snapshot),
                &snapshot.event,
            ),
            WatchRequest::OffSubnet { key, snapshot } => (
                AnomalyEvent::OffSubnet(snapshot.clone()),
                Notification::offsubnet(key, snapshot),
                &snapshot.event,
            ),
        };
        let count = self
            .ctx
            .history
            .push_anomaly(key, anomaly, self.ctx.settings.analysis.max_anomaly_events)?;
        ANOMALIES_CONFIRMED
            .with_label_values(&[self.ctx.fabric.as_str(), request.kind().as_str()])
            .inc();
        debug!(key = %key, node, kind = %request.kind(), count, "anomaly confirmed");
        self.ctx.notifier.notify(notification);

        if auto_clear {
            self.remediate(key, event).await;
        }
        Ok(())
    }

    async fn remediate(
        &self,
        key: &EndpointKey,
        event: &Event,
    ) {
        let Some(request) = ClearRequest::for_event(key, event) else {
            warn!(key = %key, node = event.node, "cannot address clear, missing vrf name or encap");
            return;
        };
        let node = request.node;
        let deadline = self.ctx.settings.remediation.timeout();
        let outcome = match timeout(deadline, self.ctx.remediation.clear(request)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => RemediationOutcome {
                success: false,
                detail: e.to_string(),
            },
            Err(_) => RemediationOutcome {
                success: false,
                detail: RemediationError::Timeout {
                    node,
                    timeout: deadline,
                }
                .to_string(),
            },
        };
        let label = if outcome.success { "success" } else { "failure" };
        REMEDIATIONS
            .with_label_values(&[self.ctx.fabric.as_str(), label])
            .inc();
        self.ctx
            .notifier
            .notify(Notification::remediation(key, node, &outcome));
    }
}
