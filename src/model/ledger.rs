use serde::Deserialize;
use serde::Serialize;

use super::EndpointKey;
use super::Event;

/// Per (key, node) ordered event history, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryLedger {
    pub key: EndpointKey,
    pub node: u32,
    /// Total events ever appended, unaffected by rotation
    pub count: u64,
    pub is_stale: bool,
    pub is_offsubnet: bool,
    pub events: Vec<Event>,
}

impl HistoryLedger {
    pub fn new(
        key: EndpointKey,
        node: u32,
    ) -> Self {
        Self {
            key,
            node,
            count: 0,
            is_stale: false,
            is_offsubnet: false,
            events: Vec::new(),
        }
    }

    /// Prepends `event`, drops the oldest entries past `capacity`, bumps the
    /// counter.
    pub fn push(
        &mut self,
        event: Event,
        capacity: usize,
    ) {
        self.events.insert(0, event);
        self.events.truncate(capacity.max(1));
        self.count += 1;
    }

    pub fn latest(&self) -> Option<&Event> {
        self.events.first()
    }

    /// Latest event when it is not a delete.
    pub fn current(&self) -> Option<&Event> {
        self.latest().filter(|e| !e.is_deleted())
    }

    pub fn oldest_ts(&self) -> Option<f64> {
        self.events.last().map(|e| e.ts)
    }

    pub fn flag(
        &self,
        flag: LedgerFlag,
    ) -> bool {
        match flag {
            LedgerFlag::Stale => self.is_stale,
            LedgerFlag::OffSubnet => self.is_offsubnet,
        }
    }

    pub fn set_flag(
        &mut self,
        flag: LedgerFlag,
        value: bool,
    ) {
        match flag {
            LedgerFlag::Stale => self.is_stale = value,
            LedgerFlag::OffSubnet => self.is_offsubnet = value,
        }
    }

    /// Copy of the ledger limited to its `slice` most recent events.
    pub fn sliced(
        &self,
        slice: usize,
    ) -> Self {
        let mut l = self.clone();
        l.events.truncate(slice);
        l
    }
}

/// Derived booleans recomputed on every analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerFlag {
    Stale,
    OffSubnet,
}
