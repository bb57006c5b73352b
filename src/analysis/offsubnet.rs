use std::collections::BTreeMap;

use tracing::trace;

use crate::constants::PC_TAG_ANY;
use crate::EndpointKey;
use crate::HistoryLedger;
use crate::OffSubnetSnapshot;
use crate::Result;
use crate::TopologyView;

/// Nodes whose current entry for an ip key sits outside every subnet of
/// the bd behind its EPG. Entries without a concrete pcTag, or whose bd has
/// no subnet of the address family, are never flagged.
pub fn analyze_offsubnet(
    key: &EndpointKey,
    ledgers: &[HistoryLedger],
    view: &mut dyn TopologyView,
) -> Result<BTreeMap<u32, OffSubnetSnapshot>> {
    let mut found = BTreeMap::new();
    if !key.is_ip() {
        return Ok(found);
    }
    for ledger in ledgers {
        let Some(event) = ledger.current() else {
            continue;
        };
        if event.pc_tag.is_empty() || event.pc_tag == PC_TAG_ANY {
            continue;
        }
        if view.offsubnet(&key.addr, key.vnid, &event.pc_tag)? == Some(true) {
            trace!("{} off-subnet on node {}", key, ledger.node);
            found.insert(
                ledger.node,
                OffSubnetSnapshot {
                    node: ledger.node,
                    remote: event.remote,
                    ts: event.ts,
                    event: event.clone(),
                },
            );
        }
    }
    Ok(found)
}
