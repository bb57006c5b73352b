use crate::Event;
use crate::HistoryLedger;

/// Up to two most recent meaningful entries of one node's ledger, newest
/// first.
///
/// A delete following the previously accepted entry by less than
/// `transitory_delete_secs` is noise. Cached or interface-less entries and
/// provisional ip placements carry no location. An XR entry repeating the
/// previously accepted one with only a different rewrite mac is a
/// duplicate.
pub fn last_events(
    ledger: &HistoryLedger,
    transitory_delete_secs: f64,
) -> Vec<Event> {
    let mut accepted: Vec<&Event> = Vec::with_capacity(2);
    for event in &ledger.events {
        if accepted.len() == 2 {
            break;
        }
        let previous = accepted.last().copied();
        if event.is_deleted() {
            match previous {
                Some(prev) if prev.ts - event.ts <= transitory_delete_secs => continue,
                _ => accepted.push(event),
            }
            continue;
        }
        if event.is_cached_or_unspecified() || event.is_provisional() {
            continue;
        }
        if let Some(prev) = previous {
            if event.is_remote()
                && prev.is_remote()
                && prev.remote == event.remote
                && !prev.differs_beyond_rewrite_mac(event)
            {
                continue;
            }
        }
        accepted.push(event);
    }
    accepted.into_iter().cloned().collect()
}
