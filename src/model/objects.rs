//! Fabric configuration objects and the records derived from them.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::EventStatus;

/// Configuration classes the dependency graph has a rule for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigClass {
    FabricNode,
    FabricExplicitGEp,
    FabricNodePEp,
    TunnelIf,
    VpcRsVpcConf,
    FvCtx,
    FvBD,
    FvAEPg,
    FvRsBd,
    FvSubnet,
}

impl ConfigClass {
    /// Initial build order: parents before the objects referencing them.
    pub const ALL: [ConfigClass; 10] = [
        ConfigClass::FabricNode,
        ConfigClass::FabricExplicitGEp,
        ConfigClass::FabricNodePEp,
        ConfigClass::TunnelIf,
        ConfigClass::VpcRsVpcConf,
        ConfigClass::FvCtx,
        ConfigClass::FvBD,
        ConfigClass::FvAEPg,
        ConfigClass::FvRsBd,
        ConfigClass::FvSubnet,
    ];

    pub fn as_class(&self) -> &'static str {
        match self {
            ConfigClass::FabricNode => "fabricNode",
            ConfigClass::FabricExplicitGEp => "fabricExplicitGEp",
            ConfigClass::FabricNodePEp => "fabricNodePEp",
            ConfigClass::TunnelIf => "tunnelIf",
            ConfigClass::VpcRsVpcConf => "vpcRsVpcConf",
            ConfigClass::FvCtx => "fvCtx",
            ConfigClass::FvBD => "fvBD",
            ConfigClass::FvAEPg => "fvAEPg",
            ConfigClass::FvRsBd => "fvRsBd",
            ConfigClass::FvSubnet => "fvSubnet",
        }
    }

    pub fn from_class(class: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_class() == class)
    }
}

impl fmt::Display for ConfigClass {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_class())
    }
}

/// Raw configuration object as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigObject {
    pub class: ConfigClass,
    pub dn: String,
    pub status: EventStatus,
    pub attrs: BTreeMap<String, String>,
    pub ts: f64,
}

impl ConfigObject {
    pub fn attr(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.attrs.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Numeric attribute, `None` when absent or malformed.
    pub fn attr_u32(
        &self,
        name: &str,
    ) -> Option<u32> {
        self.attr(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn is_deleted(&self) -> bool {
        self.status == EventStatus::Deleted
    }

    /// Applies a partial `modified` update on top of the stored object.
    pub fn merged_onto(
        &self,
        prior: &ConfigObject,
    ) -> ConfigObject {
        let mut attrs = prior.attrs.clone();
        for (k, v) in &self.attrs {
            attrs.insert(k.clone(), v.clone());
        }
        ConfigObject {
            class: self.class,
            dn: self.dn.clone(),
            status: self.status,
            attrs,
            ts: self.ts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    Active,
    Inactive,
    Unknown,
}

impl NodeState {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("active") => NodeState::Active,
            Some("inactive") | Some("disabled") | Some("decommissioned") => NodeState::Inactive,
            _ => NodeState::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u32,
    pub name: String,
    /// TEP address
    pub address: String,
    pub state: NodeState,
    /// vpc peer, `0` when not a vpc member
    pub peer: u32,
}

/// Tunnel interface resolved to the node or vpc identity behind its destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunnelRecord {
    pub node: u32,
    pub intf: String,
    pub dest: String,
    pub remote: u32,
}

/// Port-channel to vpc id binding on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcRecord {
    pub node: u32,
    pub intf: String,
    pub vpc: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VnidKind {
    Vrf,
    Bd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VnidRecord {
    pub vnid: u32,
    /// dn of the owning vrf or bd
    pub name: String,
    pub kind: VnidKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpgRecord {
    /// EPG dn
    pub name: String,
    pub vrf: u32,
    pub pc_tag: String,
    /// dn of the associated bd, empty until an association is seen
    pub bd: String,
    /// Resolved bd vnid, `0` when unresolved
    pub bd_vnid: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetRecord {
    /// Subnet dn
    pub name: String,
    /// Prefix in `addr/len` form
    pub ip: String,
    /// dn of the owning bd or EPG
    pub parent: String,
    /// Resolved bd vnid, `0` when unresolved
    pub bd_vnid: u32,
}

/// Tables of the object store. `Mo` tables mirror raw configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectTable {
    Mo(ConfigClass),
    Node,
    Tunnel,
    Vpc,
    Vnid,
    Epg,
    Subnet,
}

impl ObjectTable {
    pub fn name(&self) -> String {
        match self {
            ObjectTable::Mo(class) => format!("mo.{}", class.as_class()),
            ObjectTable::Node => "node".to_string(),
            ObjectTable::Tunnel => "tunnel".to_string(),
            ObjectTable::Vpc => "vpc".to_string(),
            ObjectTable::Vnid => "vnid".to_string(),
            ObjectTable::Epg => "epg".to_string(),
            ObjectTable::Subnet => "subnet".to_string(),
        }
    }
}

impl fmt::Display for ObjectTable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FabricObject {
    Mo(ConfigObject),
    Node(NodeRecord),
    Tunnel(TunnelRecord),
    Vpc(VpcRecord),
    Vnid(VnidRecord),
    Epg(EpgRecord),
    Subnet(SubnetRecord),
}

impl FabricObject {
    pub fn table(&self) -> ObjectTable {
        match self {
            FabricObject::Mo(mo) => ObjectTable::Mo(mo.class),
            FabricObject::Node(_) => ObjectTable::Node,
            FabricObject::Tunnel(_) => ObjectTable::Tunnel,
            FabricObject::Vpc(_) => ObjectTable::Vpc,
            FabricObject::Vnid(_) => ObjectTable::Vnid,
            FabricObject::Epg(_) => ObjectTable::Epg,
            FabricObject::Subnet(_) => ObjectTable::Subnet,
        }
    }

    /// Primary key within its table.
    pub fn name(&self) -> String {
        match self {
            FabricObject::Mo(mo) => mo.dn.clone(),
            FabricObject::Node(n) => n.id.to_string(),
            FabricObject::Tunnel(t) => tunnel_key(t.node, &t.intf),
            FabricObject::Vpc(v) => tunnel_key(v.node, &v.intf),
            FabricObject::Vnid(v) => v.vnid.to_string(),
            FabricObject::Epg(e) => e.name.clone(),
            FabricObject::Subnet(s) => s.name.clone(),
        }
    }
}

/// `node/intf` key used by the tunnel and vpc tables.
pub fn tunnel_key(
    node: u32,
    intf: &str,
) -> String {
    format!("{node}/{intf}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivedChange {
    Upserted,
    /// Dependent reference reset to the unresolved sentinel
    Reset,
    Deleted,
}

/// Object mutated by a dependency sync, used for cache invalidation.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedObject {
    pub table: ObjectTable,
    pub name: String,
    pub change: DerivedChange,
    /// New value, `None` for deletes
    pub object: Option<FabricObject>,
}

impl DerivedObject {
    pub fn upserted(object: FabricObject) -> Self {
        Self {
            table: object.table(),
            name: object.name(),
            change: DerivedChange::Upserted,
            object: Some(object),
        }
    }

    pub fn reset(object: FabricObject) -> Self {
        Self {
            table: object.table(),
            name: object.name(),
            change: DerivedChange::Reset,
            object: Some(object),
        }
    }

    pub fn deleted(
        table: ObjectTable,
        name: String,
    ) -> Self {
        Self {
            table,
            name,
            change: DerivedChange::Deleted,
            object: None,
        }
    }
}
