use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ConfigClass;
use crate::ConfigObject;
use crate::EventStatus;
use crate::FabricContext;
use crate::MockEventTransport;
use crate::MockRemediationExecutor;
use crate::Notification;
use crate::NotificationKind;
use crate::NotificationSink;
use crate::Result;
use crate::Settings;
use crate::Stores;
use crate::TopologyView;

/// In-memory topology answering peer and off-subnet lookups from fixed
/// tables.
#[derive(Debug, Default, Clone)]
pub struct FakeTopology {
    peers: HashMap<u32, u32>,
    /// `(pc_tag, addr)` to verdict
    offsubnet: HashMap<(String, String), Option<bool>>,
}

impl FakeTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `a` and `b` as vpc peers.
    pub fn with_vpc(
        mut self,
        a: u32,
        b: u32,
    ) -> Self {
        self.peers.insert(a, b);
        self.peers.insert(b, a);
        self
    }

    pub fn with_offsubnet(
        mut self,
        pc_tag: &str,
        addr: &str,
        outside: Option<bool>,
    ) -> Self {
        self.offsubnet
            .insert((pc_tag.to_string(), addr.to_string()), outside);
        self
    }
}

impl TopologyView for FakeTopology {
    fn peer(
        &mut self,
        node: u32,
    ) -> Result<u32> {
        Ok(self.peers.get(&node).copied().unwrap_or_default())
    }

    fn offsubnet(
        &mut self,
        addr: &str,
        _vrf: u32,
        pc_tag: &str,
    ) -> Result<Option<bool>> {
        Ok(self
            .offsubnet
            .get(&(pc_tag.to_string(), addr.to_string()))
            .copied()
            .flatten())
    }
}

pub fn config_object(
    class: ConfigClass,
    dn: &str,
    status: EventStatus,
    attrs: &[(&str, &str)],
) -> ConfigObject {
    ConfigObject {
        class,
        dn: dn.to_string(),
        status,
        attrs: attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        ts: 1.0,
    }
}

/// Notification sink keeping every notification for later assertions.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn taken(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.seen.lock())
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.seen.lock().iter().map(|n| n.kind).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(
        &self,
        notification: Notification,
    ) {
        self.seen.lock().push(notification);
    }
}

/// Context over `stores` whose transport and remediation mocks carry no
/// expectations; tests replace the fields they exercise.
pub fn test_context(
    settings: Settings,
    stores: &Stores,
    notifier: Arc<dyn NotificationSink>,
) -> FabricContext {
    FabricContext::new(
        Arc::new(settings),
        stores,
        Arc::new(MockEventTransport::new()),
        Arc::new(MockRemediationExecutor::new()),
        notifier,
    )
}
