use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::debug;

use crate::constants::NO_LOCAL_NODE;
use crate::physical_nodes;
use crate::vpc_node_id;
use crate::AnalysisError;
use crate::EndpointFlags;
use crate::EndpointKey;
use crate::Event;
use crate::HistoryLedger;
use crate::Result;
use crate::StaleSnapshot;
use crate::TopologyView;

/// Remote nodes whose forwarding pointer disagrees with the endpoint's local
/// attachment.
///
/// Entries without placement are neither local nor remote. When no node
/// holds the endpoint locally the expected identity is [`NO_LOCAL_NODE`] and
/// every remote node is reported, unless some node still waits for its
/// placement, in which case nothing is reported.
pub fn analyze_stale(
    key: &EndpointKey,
    ledgers: &[HistoryLedger],
    view: &mut dyn TopologyView,
    max_bounce_hops: usize,
) -> Result<BTreeMap<u32, StaleSnapshot>> {
    // nodes whose entry carries no placement yet
    let mut pending = Vec::new();
    let mut current: BTreeMap<u32, &Event> = BTreeMap::new();
    for (node, event) in ledgers.iter().filter_map(|l| l.current().map(|e| (l.node, e))) {
        if event.has_placement() {
            current.insert(node, event);
        } else {
            pending.push(node);
        }
    }

    // local node -> attachment identity
    let mut local: BTreeMap<u32, u32> = BTreeMap::new();
    let mut newest_local: Option<(f64, u32)> = None;
    for (node, event) in current.iter().filter(|(_, e)| e.is_local()) {
        let mut identity = *node;
        if event.flags.contains(EndpointFlags::VPC_ATTACHED) {
            let peer = view.peer(*node)?;
            if peer != 0 {
                if current.get(&peer).map(|p| !p.is_local()).unwrap_or(false) {
                    return Err(AnalysisError::IndeterminateTopology {
                        key: key.clone(),
                        node: *node,
                        peer,
                    }
                    .into());
                }
                identity = vpc_node_id(*node, peer);
            }
        }
        local.insert(*node, identity);
        if newest_local.map(|(ts, _)| event.ts > ts).unwrap_or(true) {
            newest_local = Some((event.ts, identity));
        }
    }
    let expected = newest_local.map(|(_, id)| id).unwrap_or(NO_LOCAL_NODE);
    if expected == NO_LOCAL_NODE && !pending.is_empty() {
        debug!(key = %key, ?pending, "local placement pending, skipping stale pass");
        return Ok(BTreeMap::new());
    }

    let resolver = Resolver {
        current: &current,
        local: &local,
        expected,
        max_hops: max_bounce_hops,
    };
    let mut stale = BTreeMap::new();
    for (node, event) in current.iter().filter(|(_, e)| !e.is_local()) {
        let ok = expected != NO_LOCAL_NODE && resolver.reaches(event, &mut BTreeSet::from([*node]), 0);
        if !ok {
            debug!(
                key = %key,
                node,
                remote = event.remote,
                expected,
                ts = event.ts,
                "stale entry"
            );
            stale.insert(
                *node,
                StaleSnapshot {
                    node: *node,
                    remote: event.remote,
                    expected_remote: expected,
                    ts: event.ts,
                    event: (*event).clone(),
                },
            );
        }
    }
    Ok(stale)
}

struct Resolver<'a> {
    current: &'a BTreeMap<u32, &'a Event>,
    local: &'a BTreeMap<u32, u32>,
    expected: u32,
    max_hops: usize,
}

impl Resolver<'_> {
    /// Whether the XR `event` leads to the expected identity, directly,
    /// through the physical members of a vpc pointer, or through a
    /// bounce-to-proxy chain of at most `max_hops` intermediate nodes.
    fn reaches(
        &self,
        event: &Event,
        visited: &mut BTreeSet<u32>,
        hops: usize,
    ) -> bool {
        if event.remote == self.expected {
            return true;
        }
        physical_nodes(event.remote).into_iter().all(|p| {
            if self.local.get(&p) == Some(&self.expected) {
                return true;
            }
            if hops >= self.max_hops || !visited.insert(p) {
                return false;
            }
            match self.current.get(&p) {
                Some(next) if !next.is_local() && next.is_bounce() => self.reaches(next, visited, hops + 1),
                _ => false,
            }
        })
    }
}
