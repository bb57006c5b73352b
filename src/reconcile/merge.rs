use std::ops::BitOr;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;

use crate::EndpointFlags;
use crate::Event;
use crate::EventStatus;
use crate::HistoryStore;
use crate::Result;
use crate::SourceClass;

/// Result of merging one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// A new ledger entry was appended
    pub updated: bool,
    /// The key should be re-analyzed
    pub analyze: bool,
}

impl MergeOutcome {
    pub const UNCHANGED: MergeOutcome = MergeOutcome {
        updated: false,
        analyze: false,
    };

    fn appended(analyze: bool) -> Self {
        Self {
            updated: true,
            analyze,
        }
    }
}

impl BitOr for MergeOutcome {
    type Output = MergeOutcome;

    fn bitor(
        self,
        rhs: Self,
    ) -> Self {
        MergeOutcome {
            updated: self.updated || rhs.updated,
            analyze: self.analyze || rhs.analyze,
        }
    }
}

pub struct Reconciler {
    history: Arc<dyn HistoryStore>,
    capacity: usize,
}

impl Reconciler {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        capacity: usize,
    ) -> Self {
        Self { history, capacity }
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Merges `event` into the ledger of `(event.key, event.node)`.
    pub fn merge(
        &self,
        event: Event,
    ) -> Result<MergeOutcome> {
        let ledger = self
            .history
            .read_latest(&event.key, Some(event.node), self.capacity)?
            .into_iter()
            .next();
        let Some(prior) = ledger.as_ref().and_then(|l| l.latest()) else {
            return self.merge_first(event);
        };

        // timestamp regression guard, per source class only
        if let Some(last) = ledger
            .as_ref()
            .and_then(|l| l.events.iter().find(|e| e.class == event.class))
        {
            if event.ts < last.ts {
                debug!(
                    key = %event.key,
                    node = event.node,
                    ts = event.ts,
                    last_ts = last.ts,
                    "dropping out of order {} event",
                    event.class.as_class()
                );
                return Ok(MergeOutcome::UNCHANGED);
            }
        }

        let next = match event.class {
            SourceClass::RsIpEp => merge_rewrite(prior, &event),
            _ => merge_plain(prior, event),
        };
        let Some((next, analyze)) = next else {
            return Ok(MergeOutcome::UNCHANGED);
        };
        if !next.placement_differs(prior) {
            trace!("no change for {} on node {}", next.key, next.node);
            return Ok(MergeOutcome::UNCHANGED);
        }
        self.append(&next)?;
        Ok(MergeOutcome::appended(analyze))
    }

    fn merge_first(
        &self,
        event: Event,
    ) -> Result<MergeOutcome> {
        if event.status != EventStatus::Created {
            trace!(
                "ignoring {} {} without baseline",
                event.key,
                event.status.as_str()
            );
            return Ok(MergeOutcome::UNCHANGED);
        }
        let analyze = event.class != SourceClass::RsIpEp && !event.is_provisional();
        self.append(&event)?;
        Ok(MergeOutcome::appended(analyze))
    }

    fn append(
        &self,
        event: &Event,
    ) -> Result<()> {
        let ledger = self.history.append_event(event, self.capacity)?;
        debug!(
            key = %event.key,
            node = event.node,
            ts = event.ts,
            count = ledger.count,
            "appended {} {}",
            event.class.as_class(),
            event.status.as_str()
        );
        Ok(())
    }
}

/// Rewrite-association on top of the prior placement: only the rewrite
/// fields come from the event.
fn merge_rewrite(
    prior: &Event,
    event: &Event,
) -> Option<(Event, bool)> {
    let mut next = prior.clone();
    next.ts = event.ts;
    next.class = SourceClass::RsIpEp;
    if event.is_deleted() {
        if !prior.has_rewrite() {
            return None;
        }
        next.rw_mac.clear();
        next.rw_bd = 0;
        return Some((next, false));
    }
    next.rw_mac = event.rw_mac.clone();
    next.rw_bd = event.rw_bd;
    let analyze = next.is_local() && !next.is_deleted() && !next.is_provisional();
    Some((next, analyze))
}

/// Plain endpoint update. The prior rewrite is always carried forward.
fn merge_plain(
    prior: &Event,
    mut event: Event,
) -> Option<(Event, bool)> {
    match event.status {
        EventStatus::Deleted => {
            if prior.is_deleted() {
                return None;
            }
            let mut next = prior.clone();
            next.ts = event.ts;
            next.class = event.class;
            next.status = EventStatus::Deleted;
            next.flags = EndpointFlags::empty();
            next.intf_id.clear();
            next.intf_name.clear();
            next.pc_tag.clear();
            next.encap.clear();
            next.remote = 0;
            next.epg_name.clear();
            if !event.dn.is_empty() {
                next.dn = event.dn;
            }
            Some((next, true))
        }
        EventStatus::Modified if prior.is_deleted() => None,
        EventStatus::Modified => {
            fill_omitted(&mut event, prior);
            carry_rewrite(&mut event, prior);
            let analyze = !event.is_provisional();
            Some((event, analyze))
        }
        EventStatus::Created => {
            carry_rewrite(&mut event, prior);
            let analyze = !event.is_provisional();
            Some((event, analyze))
        }
    }
}

fn carry_rewrite(
    event: &mut Event,
    prior: &Event,
) {
    if event.key.is_ip() {
        event.rw_mac = prior.rw_mac.clone();
        event.rw_bd = prior.rw_bd;
    }
}

/// Partial `modified` update: omitted attributes keep their prior value.
fn fill_omitted(
    event: &mut Event,
    prior: &Event,
) {
    fn fill(
        field: &mut String,
        prior: &str,
    ) {
        if field.is_empty() {
            *field = prior.to_string();
        }
    }

    if event.intf_id.is_empty() {
        event.intf_id = prior.intf_id.clone();
        fill(&mut event.intf_name, &prior.intf_name);
        if event.remote == 0 {
            event.remote = prior.remote;
        }
    }
    if event.pc_tag.is_empty() {
        event.pc_tag = prior.pc_tag.clone();
        fill(&mut event.epg_name, &prior.epg_name);
    }
    fill(&mut event.encap, &prior.encap);
    fill(&mut event.vnid_name, &prior.vnid_name);
    fill(&mut event.dn, &prior.dn);
    if event.flags.is_empty() {
        event.flags = prior.flags;
    }
    if event.vrf == 0 {
        event.vrf = prior.vrf;
    }
    if event.bd == 0 {
        event.bd = prior.bd;
    }
}
