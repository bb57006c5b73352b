use std::sync::Arc;

use crate::EventTransport;
use crate::HistoryStore;
use crate::NotificationSink;
use crate::ObjectStore;
use crate::RefreshOptions;
use crate::RemediationExecutor;
use crate::Settings;
use crate::Stores;

/// Handles shared by every task of one fabric.
///
/// Built once per run of the fabric task and cloned into each component;
/// nothing in here is mutated after construction.
#[derive(Clone)]
pub struct FabricContext {
    pub fabric: String,
    pub settings: Arc<Settings>,
    pub history: Arc<dyn HistoryStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub transport: Arc<dyn EventTransport>,
    pub remediation: Arc<dyn RemediationExecutor>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl FabricContext {
    pub fn new(
        settings: Arc<Settings>,
        stores: &Stores,
        transport: Arc<dyn EventTransport>,
        remediation: Arc<dyn RemediationExecutor>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            fabric: settings.fabric.name.clone(),
            settings,
            history: stores.history.clone(),
            objects: stores.objects.clone(),
            transport,
            remediation,
            notifier,
        }
    }

    pub fn refresh_options(&self) -> RefreshOptions {
        RefreshOptions {
            overlay_vnid: self.settings.fabric.overlay_vnid,
            timeout: self.settings.dispatcher.refresh_timeout(),
        }
    }
}

impl std::fmt::Debug for FabricContext {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("FabricContext")
            .field("fabric", &self.fabric)
            .finish()
    }
}
