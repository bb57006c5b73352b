use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::constants::NO_LOCAL_NODE;
use crate::AnalysisConfig;
use crate::AnomalyKind;
use crate::EndpointKey;
use crate::WatchRequest;

type WatchId = (EndpointKey, u32, AnomalyKind);

#[derive(Debug, Clone)]
struct Pending {
    execute_at: Instant,
    request: WatchRequest,
}

/// Pending anomaly confirmations, one per (key, node, kind).
#[derive(Debug, Default)]
pub struct WatchTable {
    pending: BTreeMap<WatchId, Pending>,
}

impl WatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `request` to fire `window` after `now`.
    ///
    /// A request carrying the same timestamp as the pending one for its
    /// (key, node, kind) is ignored; any other timestamp replaces it.
    pub fn schedule(
        &mut self,
        request: WatchRequest,
        window: Duration,
        now: Instant,
    ) -> bool {
        let id = (request.key().clone(), request.node(), request.kind());
        if let Some(p) = self.pending.get(&id) {
            if p.request.ts() == request.ts() {
                return false;
            }
        }
        self.pending.insert(
            id,
            Pending {
                execute_at: now + window,
                request,
            },
        );
        true
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.execute_at).min()
    }

    /// Removes and returns every request due at `now`, earliest first.
    pub fn pop_expired(
        &mut self,
        now: Instant,
    ) -> Vec<WatchRequest> {
        let due: Vec<WatchId> = self
            .pending
            .iter()
            .filter(|(_, p)| p.execute_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        let mut expired: Vec<Pending> = due.iter().filter_map(|id| self.pending.remove(id)).collect();
        expired.sort_by_key(|p| p.execute_at);
        expired.into_iter().map(|p| p.request).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Debounce window of `request`. Stale entries with no local node anywhere
/// converge slowly and get the longer xr window.
pub fn watch_window(
    request: &WatchRequest,
    config: &AnalysisConfig,
) -> Duration {
    match request {
        WatchRequest::Stale { snapshot, .. } if snapshot.expected_remote == NO_LOCAL_NODE => config.xr_stale_window(),
        WatchRequest::Stale { .. } => config.stale_window(),
        WatchRequest::OffSubnet { .. } => config.offsubnet_window(),
    }
}
