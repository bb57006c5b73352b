use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;

use super::rules;
use super::SyncContext;
use crate::ConfigClass;
use crate::ConfigObject;
use crate::DerivedObject;
use crate::EventStatus;
use crate::FabricObject;
use crate::ObjectStore;
use crate::ObjectTable;
use crate::Result;

type DeriveFn = fn(&mut SyncContext<'_>, &ConfigObject) -> Result<()>;

/// Derivation registered for one configuration class.
#[derive(Clone, Copy)]
pub struct DependencyRule {
    pub class: ConfigClass,
    /// Derived tables the rule may create, update or reset
    pub derives: &'static [ObjectTable],
    derive: DeriveFn,
}

impl std::fmt::Debug for DependencyRule {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DependencyRule")
            .field("class", &self.class)
            .field("derives", &self.derives)
            .finish()
    }
}

impl DependencyRule {
    const fn new(
        class: ConfigClass,
        derives: &'static [ObjectTable],
        derive: DeriveFn,
    ) -> Self {
        Self {
            class,
            derives,
            derive,
        }
    }
}

pub struct DependencyGraph {
    objects: Arc<dyn ObjectStore>,
    rules: BTreeMap<ConfigClass, DependencyRule>,
}

impl DependencyGraph {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        let rules = [
            DependencyRule::new(
                ConfigClass::FabricNode,
                &[ObjectTable::Node, ObjectTable::Tunnel],
                rules::fabric_node,
            ),
            DependencyRule::new(
                ConfigClass::FabricExplicitGEp,
                &[ObjectTable::Tunnel],
                rules::explicit_gep,
            ),
            DependencyRule::new(
                ConfigClass::FabricNodePEp,
                &[ObjectTable::Node, ObjectTable::Tunnel],
                rules::node_pep,
            ),
            DependencyRule::new(ConfigClass::TunnelIf, &[ObjectTable::Tunnel], rules::tunnel_if),
            DependencyRule::new(ConfigClass::VpcRsVpcConf, &[ObjectTable::Vpc], rules::vpc_conf),
            DependencyRule::new(ConfigClass::FvCtx, &[ObjectTable::Vnid], rules::fv_ctx),
            DependencyRule::new(
                ConfigClass::FvBD,
                &[ObjectTable::Vnid, ObjectTable::Epg, ObjectTable::Subnet],
                rules::fv_bd,
            ),
            DependencyRule::new(
                ConfigClass::FvAEPg,
                &[ObjectTable::Epg, ObjectTable::Subnet],
                rules::fv_aepg,
            ),
            DependencyRule::new(
                ConfigClass::FvRsBd,
                &[ObjectTable::Epg, ObjectTable::Subnet],
                rules::fv_rs_bd,
            ),
            DependencyRule::new(ConfigClass::FvSubnet, &[ObjectTable::Subnet], rules::fv_subnet),
        ]
        .into_iter()
        .map(|r| (r.class, r))
        .collect();

        Self { objects, rules }
    }

    pub fn rule(
        &self,
        class: ConfigClass,
    ) -> Option<&DependencyRule> {
        self.rules.get(&class)
    }

    /// Applies one configuration event and returns every object it mutated.
    pub fn sync(
        &self,
        fabric: &str,
        event: &ConfigObject,
    ) -> Result<Vec<DerivedObject>> {
        let Some(rule) = self.rules.get(&event.class) else {
            return Ok(Vec::new());
        };
        let mut ctx = SyncContext::new(fabric, self.objects.as_ref());
        let table = ObjectTable::Mo(event.class);
        let prior = ctx.mo(event.class, &event.dn)?;

        let effective = match (event.status, prior) {
            (EventStatus::Deleted, None) => {
                trace!("delete of unknown {} {}", event.class, event.dn);
                event.clone()
            }
            (EventStatus::Deleted, Some(prior)) => {
                ctx.delete(table, &event.dn)?;
                event.merged_onto(&prior)
            }
            (EventStatus::Modified, Some(prior)) => {
                let merged = event.merged_onto(&prior);
                ctx.upsert(FabricObject::Mo(merged.clone()))?;
                merged
            }
            (_, _) => {
                ctx.upsert(FabricObject::Mo(event.clone()))?;
                event.clone()
            }
        };

        (rule.derive)(&mut ctx, &effective)?;
        let changes = ctx.into_changes();
        debug!(
            "sync {} {} {} -> {} change(s)",
            event.class,
            event.status.as_str(),
            event.dn,
            changes.len()
        );
        Ok(changes)
    }
}
