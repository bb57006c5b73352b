//! Move, stale and off-subnet detection over the current per-node state of
//! one key.
//!
//! Detection is pure over the ledgers and a [`TopologyView`]; the
//! orchestration in [`analyze_key`] persists moves and endpoint summaries
//! directly, while stale and off-subnet findings only update the ledger
//! flags and are handed to the debounce watcher for confirmation.

mod last_events;
mod moves;
mod offsubnet;
mod stale;
mod verdicts;

pub use last_events::*;
pub use moves::*;
pub use offsubnet::*;
pub use stale::*;

#[cfg(test)]
mod last_events_test;

use tracing::debug;
use tracing::warn;

use crate::AnalysisConfig;
use crate::AnomalyKind;
use crate::EndpointKey;
use crate::Error;
use crate::HistoryStore;
use crate::LedgerFlag;
use crate::MoveDelta;
use crate::Result;
use crate::TopologyView;
use crate::WatchRequest;

/// Findings of one analysis pass.
#[derive(Debug, Default)]
pub struct AnalysisOutcome {
    /// Newly persisted move
    pub moved: Option<MoveDelta>,
    /// Unconfirmed stale and off-subnet entries to debounce
    pub watch: Vec<WatchRequest>,
}

/// Runs every analysis for `key`.
///
/// An indeterminate vpc topology skips only the stale pass; the next event
/// for the key retries it.
pub fn analyze_key(
    history: &dyn HistoryStore,
    view: &mut dyn TopologyView,
    key: &EndpointKey,
    config: &AnalysisConfig,
) -> Result<AnalysisOutcome> {
    let mut outcome = AnalysisOutcome::default();
    let ledgers = history.read_latest(key, None, config.max_events_per_node)?;
    if ledgers.is_empty() {
        return Ok(outcome);
    }

    let moves = analyze_move(&ledgers, view, config.transitory_delete_secs)?;
    if let Some(newest) = &moves.newest {
        update_summary(history, key, newest, config.max_endpoint_events)?;
    }
    if let Some(delta) = moves.delta {
        if persist_move(history, key, &delta, config.max_anomaly_events)? {
            outcome.moved = Some(delta);
        }
    }

    match analyze_stale(key, &ledgers, view, config.max_bounce_hops) {
        Ok(found) => {
            verdicts::record_flags(history, key, &ledgers, LedgerFlag::Stale, found.keys())?;
            for (node, snapshot) in found {
                if verdicts::is_new(history, key, AnomalyKind::Stale, node, snapshot.remote, snapshot.ts)? {
                    outcome.watch.push(WatchRequest::Stale {
                        key: key.clone(),
                        snapshot,
                    });
                }
            }
        }
        Err(e @ Error::Analysis(_)) => warn!("stale analysis skipped: {}", e),
        Err(e) => return Err(e),
    }

    if key.is_ip() {
        let found = analyze_offsubnet(key, &ledgers, view)?;
        verdicts::record_flags(history, key, &ledgers, LedgerFlag::OffSubnet, found.keys())?;
        for (node, snapshot) in found {
            if verdicts::is_new(history, key, AnomalyKind::OffSubnet, node, snapshot.remote, snapshot.ts)? {
                outcome.watch.push(WatchRequest::OffSubnet {
                    key: key.clone(),
                    snapshot,
                });
            }
        }
    }

    debug!(
        key = %key,
        moved = outcome.moved.is_some(),
        watch = outcome.watch.len(),
        "analysis complete"
    );
    Ok(outcome)
}
