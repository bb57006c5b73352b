use tracing::debug;

use super::last_events;
use crate::vpc_node_id;
use crate::AnomalyEvent;
use crate::AnomalyKind;
use crate::EndpointFlags;
use crate::EndpointKey;
use crate::Event;
use crate::HistoryLedger;
use crate::HistoryStore;
use crate::MoveDelta;
use crate::Result;
use crate::TopologyView;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MoveAnalysis {
    /// Most recent local placement across every node
    pub newest: Option<Event>,
    /// Move into `newest` from the previous distinct placement
    pub delta: Option<MoveDelta>,
}

/// Finds the two most recent distinct local placements of a key across all
/// nodes. vpc members are collapsed to the vpc identity first.
pub fn analyze_move(
    ledgers: &[HistoryLedger],
    view: &mut dyn TopologyView,
    transitory_delete_secs: f64,
) -> Result<MoveAnalysis> {
    let mut locals = Vec::new();
    for ledger in ledgers {
        for mut event in last_events(ledger, transitory_delete_secs) {
            if event.is_deleted() || !event.is_local() {
                continue;
            }
            if event.flags.contains(EndpointFlags::VPC_ATTACHED) {
                let peer = view.peer(event.node)?;
                if peer != 0 {
                    event.node = vpc_node_id(event.node, peer);
                }
            }
            locals.push(event);
        }
    }
    locals.sort_by(|a, b| b.ts.total_cmp(&a.ts));

    let Some(dst) = locals.first() else {
        return Ok(MoveAnalysis::default());
    };
    let delta = locals
        .iter()
        .find(|e| !MoveDelta::same_placement(e, dst))
        .map(|src| MoveDelta {
            src: src.clone(),
            dst: dst.clone(),
        });
    Ok(MoveAnalysis {
        newest: Some(dst.clone()),
        delta,
    })
}

/// Persists `delta` unless it repeats the last stored move or is older than
/// it. Returns whether it was persisted.
pub fn persist_move(
    history: &dyn HistoryStore,
    key: &EndpointKey,
    delta: &MoveDelta,
    capacity: usize,
) -> Result<bool> {
    if let Some(AnomalyEvent::Move(stored)) = history.latest_anomaly(key, AnomalyKind::Move, 0)? {
        if delta.same_as(&stored) {
            return Ok(false);
        }
        if delta.dst.ts < stored.dst.ts {
            debug!(
                key = %key,
                dst_ts = delta.dst.ts,
                stored_ts = stored.dst.ts,
                "ignoring move older than the last recorded one"
            );
            return Ok(false);
        }
    }
    let count = history.push_anomaly(key, AnomalyEvent::Move(delta.clone()), capacity)?;
    debug!(key = %key, count, "move recorded");
    Ok(true)
}

/// Appends `newest` to the endpoint summary when it is a new placement.
pub fn update_summary(
    history: &dyn HistoryStore,
    key: &EndpointKey,
    newest: &Event,
    capacity: usize,
) -> Result<bool> {
    let unchanged = history
        .read_endpoint(key)?
        .and_then(|r| r.latest().map(|l| MoveDelta::same_placement(l, newest)))
        .unwrap_or(false);
    if unchanged {
        return Ok(false);
    }
    history.push_endpoint_event(key, newest.clone(), capacity)?;
    Ok(true)
}
