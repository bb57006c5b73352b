//! Ledger flag maintenance and de-duplication shared by the stale and
//! off-subnet passes.

use std::collections::BTreeSet;

use crate::AnomalyKind;
use crate::EndpointKey;
use crate::HistoryLedger;
use crate::HistoryStore;
use crate::LedgerFlag;
use crate::Result;

/// Sets `flag` on the ledgers of `flagged` nodes and clears it everywhere
/// else. Only ledgers whose value changes are written.
pub(super) fn record_flags<'a>(
    history: &dyn HistoryStore,
    key: &EndpointKey,
    ledgers: &[HistoryLedger],
    flag: LedgerFlag,
    flagged: impl IntoIterator<Item = &'a u32>,
) -> Result<()> {
    let flagged: BTreeSet<u32> = flagged.into_iter().copied().collect();
    for ledger in ledgers {
        let wanted = flagged.contains(&ledger.node);
        if ledger.flag(flag) != wanted {
            history.set_flag(key, ledger.node, flag, wanted)?;
        }
    }
    Ok(())
}

/// False when the last confirmed anomaly for `(key, node)` already reports
/// the same remote at the same time.
pub(super) fn is_new(
    history: &dyn HistoryStore,
    key: &EndpointKey,
    kind: AnomalyKind,
    node: u32,
    remote: u32,
    ts: f64,
) -> Result<bool> {
    Ok(history
        .latest_anomaly(key, kind, node)?
        .and_then(|a| a.dedup_fields())
        != Some((remote, ts)))
}
