use std::fmt;

#[cfg(test)]
use mockall::automock;
use tracing::info;

use crate::node_label;
use crate::EndpointKey;
use crate::MoveDelta;
use crate::OffSubnetSnapshot;
use crate::RemediationOutcome;
use crate::StaleSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Move,
    Stale,
    OffSubnet,
    /// Outcome of an automatic clear
    Remediation,
    /// Key dropped after repeated backlog overflows
    KeyFailure,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Move => "move",
            NotificationKind::Stale => "stale",
            NotificationKind::OffSubnet => "offsubnet",
            NotificationKind::Remediation => "remediation",
            NotificationKind::KeyFailure => "key_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub fabric: String,
    pub kind: NotificationKind,
    pub key: EndpointKey,
    pub nodes: Vec<u32>,
    pub description: String,
}

impl Notification {
    fn new(
        kind: NotificationKind,
        key: &EndpointKey,
        nodes: Vec<u32>,
        description: String,
    ) -> Self {
        Self {
            id: nanoid::nanoid!(),
            fabric: key.fabric.clone(),
            kind,
            key: key.clone(),
            nodes,
            description,
        }
    }

    pub fn moved(
        key: &EndpointKey,
        delta: &MoveDelta,
    ) -> Self {
        Self::new(
            NotificationKind::Move,
            key,
            vec![delta.src.node, delta.dst.node],
            format!(
                "{} moved from [{}] to [{}]",
                key,
                delta.src.describe(),
                delta.dst.describe()
            ),
        )
    }

    pub fn stale(
        key: &EndpointKey,
        snapshot: &StaleSnapshot,
    ) -> Self {
        Self::new(
            NotificationKind::Stale,
            key,
            vec![snapshot.node],
            format!(
                "{} is stale on node {}: points to {}, expected {}",
                key,
                node_label(snapshot.node),
                node_label(snapshot.remote),
                node_label(snapshot.expected_remote)
            ),
        )
    }

    pub fn offsubnet(
        key: &EndpointKey,
        snapshot: &OffSubnetSnapshot,
    ) -> Self {
        Self::new(
            NotificationKind::OffSubnet,
            key,
            vec![snapshot.node],
            format!(
                "{} learned off-subnet on node {}: {}",
                key,
                node_label(snapshot.node),
                snapshot.event.describe()
            ),
        )
    }

    pub fn remediation(
        key: &EndpointKey,
        node: u32,
        outcome: &RemediationOutcome,
    ) -> Self {
        let verb = if outcome.success { "cleared" } else { "failed to clear" };
        Self::new(
            NotificationKind::Remediation,
            key,
            vec![node],
            format!("{} {} on node {}: {}", verb, key, node_label(node), outcome.detail),
        )
    }

    pub fn key_failure(
        key: &EndpointKey,
        attempts: u32,
    ) -> Self {
        Self::new(
            NotificationKind::KeyFailure,
            key,
            Vec::new(),
            format!("{key} exceeded its job backlog {attempts} times, session dropped"),
        )
    }
}

impl fmt::Display for Notification {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.description)
    }
}

/// Delivery channel for notifications. Implementations must not block.
#[cfg_attr(test, automock)]
pub trait NotificationSink: Send + Sync + 'static {
    fn notify(
        &self,
        notification: Notification,
    );
}

/// Writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(
        &self,
        n: Notification,
    ) {
        info!(
            id = %n.id,
            fabric = %n.fabric,
            kind = n.kind.as_str(),
            nodes = ?n.nodes,
            "{}",
            n.description
        );
    }
}
