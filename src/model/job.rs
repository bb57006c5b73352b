//! Messages exchanged between the dispatcher, workers, the priority worker
//! and the watcher. Everything is passed by value over tokio channels.

use std::fmt;

use tokio::time::Instant;

use super::ConfigObject;
use super::EndpointKey;
use super::Event;
use super::NodeState;

/// Unit of work dispatched to a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub key: EndpointKey,
    pub ts: f64,
    pub action: JobAction,
    /// Session generation stamped by the dispatcher, 0 until dispatched
    pub session: u64,
}

impl Job {
    pub fn analyze(event: Event) -> Self {
        Self {
            key: event.key.clone(),
            ts: event.ts,
            action: JobAction::Analyze(Box::new(event)),
            session: 0,
        }
    }

    pub fn refresh(
        key: EndpointKey,
        ts: f64,
    ) -> Self {
        Self {
            key,
            ts,
            action: JobAction::Refresh,
            session: 0,
        }
    }

    pub fn delete_endpoint(
        key: EndpointKey,
        ts: f64,
    ) -> Self {
        Self {
            key,
            ts,
            action: JobAction::DeleteEndpoint,
            session: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobAction {
    /// Merge one event then analyze the key
    Analyze(Box<Event>),
    /// Out-of-band refetch of the key
    Refresh,
    /// Bulk delete of every record for the key
    DeleteEndpoint,
    /// Key exceeded its backlog too many times
    KeyFailure { attempts: u32 },
}

impl JobAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::Analyze(_) => "analyze",
            JobAction::Refresh => "refresh",
            JobAction::DeleteEndpoint => "delete",
            JobAction::KeyFailure { .. } => "key_failure",
        }
    }
}

/// Supervised task identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Worker(usize),
    Priority,
    Watcher,
}

impl fmt::Display for Entity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Entity::Worker(id) => write!(f, "worker-{id}"),
            Entity::Priority => f.write_str("priority"),
            Entity::Watcher => f.write_str("watcher"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hello {
    pub seq: u64,
    pub sent_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelloReply {
    pub entity: Entity,
    pub seq: u64,
}

/// Job completion reported back to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDone {
    pub worker: usize,
    pub key: EndpointKey,
    pub session: u64,
}

/// Cache invalidation broadcast by the priority worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFlush {
    pub collection: CacheCollection,
    /// Flush only entries carrying this name, the whole collection otherwise
    pub name: Option<String>,
}

/// Namespaces of the per-worker cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCollection {
    Node,
    Tunnel,
    Vpc,
    Vnid,
    Epg,
    Subnet,
    OffSubnet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    Job(Job),
    Hello(Hello),
    ClearCache(CacheFlush),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PriorityMessage {
    Config(ConfigObject),
    Hello(Hello),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchMessage {
    Watch(WatchRequest),
    NodeState { node: u32, state: NodeState },
    Hello(Hello),
}

/// Debounce request for one unconfirmed anomaly.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchRequest {
    Stale {
        key: EndpointKey,
        snapshot: super::StaleSnapshot,
    },
    OffSubnet {
        key: EndpointKey,
        snapshot: super::OffSubnetSnapshot,
    },
}

impl WatchRequest {
    pub fn key(&self) -> &EndpointKey {
        match self {
            WatchRequest::Stale { key, .. } => key,
            WatchRequest::OffSubnet { key, .. } => key,
        }
    }

    pub fn node(&self) -> u32 {
        match self {
            WatchRequest::Stale { snapshot, .. } => snapshot.node,
            WatchRequest::OffSubnet { snapshot, .. } => snapshot.node,
        }
    }

    pub fn ts(&self) -> f64 {
        match self {
            WatchRequest::Stale { snapshot, .. } => snapshot.ts,
            WatchRequest::OffSubnet { snapshot, .. } => snapshot.ts,
        }
    }

    pub fn kind(&self) -> super::AnomalyKind {
        match self {
            WatchRequest::Stale { .. } => super::AnomalyKind::Stale,
            WatchRequest::OffSubnet { .. } => super::AnomalyKind::OffSubnet,
        }
    }
}
