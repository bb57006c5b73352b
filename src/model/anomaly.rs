use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::EndpointKey;
use super::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnomalyKind {
    Move,
    Stale,
    OffSubnet,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::Move => "move",
            AnomalyKind::Stale => "stale",
            AnomalyKind::OffSubnet => "offsubnet",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two consecutive distinct local placements of one key.
///
/// `node` on `src`/`dst` is already collapsed to the vpc identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveDelta {
    pub src: Event,
    pub dst: Event,
}

impl MoveDelta {
    /// Compares the placement fields that define a move.
    pub fn same_placement(
        a: &Event,
        b: &Event,
    ) -> bool {
        a.node == b.node
            && a.intf_name == b.intf_name
            && a.encap == b.encap
            && a.pc_tag == b.pc_tag
            && a.rw_mac == b.rw_mac
            && a.rw_bd == b.rw_bd
    }

    /// Same src and dst as `other` by the move comparison fields.
    pub fn same_as(
        &self,
        other: &MoveDelta,
    ) -> bool {
        Self::same_placement(&self.src, &other.src) && Self::same_placement(&self.dst, &other.dst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleSnapshot {
    pub node: u32,
    /// Where the node currently points
    pub remote: u32,
    /// Where it should point, `0` when no node holds the endpoint locally
    pub expected_remote: u32,
    pub ts: f64,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffSubnetSnapshot {
    pub node: u32,
    pub remote: u32,
    pub ts: f64,
    pub event: Event,
}

/// One confirmed anomaly as persisted in an [`AnomalyRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnomalyEvent {
    Move(MoveDelta),
    Stale(StaleSnapshot),
    OffSubnet(OffSubnetSnapshot),
}

impl AnomalyEvent {
    pub fn kind(&self) -> AnomalyKind {
        match self {
            AnomalyEvent::Move(_) => AnomalyKind::Move,
            AnomalyEvent::Stale(_) => AnomalyKind::Stale,
            AnomalyEvent::OffSubnet(_) => AnomalyKind::OffSubnet,
        }
    }

    /// Comparison timestamp: dst placement for moves, observation otherwise.
    pub fn ts(&self) -> f64 {
        match self {
            AnomalyEvent::Move(m) => m.dst.ts,
            AnomalyEvent::Stale(s) => s.ts,
            AnomalyEvent::OffSubnet(o) => o.ts,
        }
    }

    /// Node scope of the record; moves are per key and use `0`.
    pub fn node(&self) -> u32 {
        match self {
            AnomalyEvent::Move(_) => 0,
            AnomalyEvent::Stale(s) => s.node,
            AnomalyEvent::OffSubnet(o) => o.node,
        }
    }

    /// De-duplication fields for per-node anomalies.
    pub fn dedup_fields(&self) -> Option<(u32, f64)> {
        match self {
            AnomalyEvent::Move(_) => None,
            AnomalyEvent::Stale(s) => Some((s.remote, s.ts)),
            AnomalyEvent::OffSubnet(o) => Some((o.remote, o.ts)),
        }
    }
}

/// Last confirmed snapshots plus an occurrence counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub key: EndpointKey,
    pub node: u32,
    pub kind: AnomalyKind,
    pub count: u64,
    /// Most recent first
    pub events: Vec<AnomalyEvent>,
}

impl AnomalyRecord {
    pub fn new(
        key: EndpointKey,
        node: u32,
        kind: AnomalyKind,
    ) -> Self {
        Self {
            key,
            node,
            kind,
            count: 0,
            events: Vec::new(),
        }
    }

    pub fn latest(&self) -> Option<&AnomalyEvent> {
        self.events.first()
    }

    pub fn push(
        &mut self,
        event: AnomalyEvent,
        capacity: usize,
    ) {
        self.events.insert(0, event);
        self.events.truncate(capacity.max(1));
        self.count += 1;
    }
}

/// Per-key summary of analyzed local placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub key: EndpointKey,
    pub count: u64,
    /// Most recent first
    pub events: Vec<Event>,
}

impl EndpointRecord {
    pub fn new(key: EndpointKey) -> Self {
        Self {
            key,
            count: 0,
            events: Vec::new(),
        }
    }

    pub fn latest(&self) -> Option<&Event> {
        self.events.first()
    }

    pub fn push(
        &mut self,
        event: Event,
        capacity: usize,
    ) {
        self.events.insert(0, event);
        self.events.truncate(capacity.max(1));
        self.count += 1;
    }
}
