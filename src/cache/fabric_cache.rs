use std::sync::Arc;

use tracing::trace;

use super::CacheItem;
use super::MultiIndexCache;
use crate::constants::PC_TAG_ANY;
use crate::net::outside_all;
use crate::tunnel_key;
use crate::CacheCollection;
use crate::CacheFlush;
use crate::DerivedObject;
use crate::EndpointFlags;
use crate::EpgRecord;
use crate::Event;
use crate::FabricObject;
use crate::NodeRecord;
use crate::ObjectStore;
use crate::ObjectTable;
use crate::Result;
use crate::SubnetRecord;
use crate::TunnelRecord;
use crate::VnidRecord;
use crate::VpcRecord;

impl CacheItem for NodeRecord {
    fn names(&self) -> Vec<String> {
        vec![self.id.to_string()]
    }
}

impl CacheItem for TunnelRecord {
    fn names(&self) -> Vec<String> {
        vec![tunnel_key(self.node, &self.intf)]
    }
}

impl CacheItem for VpcRecord {
    fn names(&self) -> Vec<String> {
        vec![tunnel_key(self.node, &self.intf)]
    }
}

impl CacheItem for VnidRecord {
    fn names(&self) -> Vec<String> {
        vec![self.vnid.to_string(), self.name.clone()]
    }
}

impl CacheItem for EpgRecord {
    fn names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}

/// Subnets resolved to one bd.
#[derive(Debug, Clone, PartialEq)]
pub struct SubnetList {
    pub bd_vnid: u32,
    pub subnets: Vec<SubnetRecord>,
}

impl CacheItem for SubnetList {
    fn names(&self) -> Vec<String> {
        let mut names = vec![self.bd_vnid.to_string()];
        names.extend(self.subnets.iter().map(|s| s.name.clone()));
        names
    }
}

/// Cached off-subnet evaluation, named after every object it was derived
/// from so that a flush of any of them drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct OffSubnetVerdict {
    pub outside: Option<bool>,
    pub derived_from: Vec<String>,
}

impl CacheItem for OffSubnetVerdict {
    fn names(&self) -> Vec<String> {
        self.derived_from.clone()
    }
}

/// Topology lookups needed by the analysis engines.
pub trait TopologyView {
    /// vpc peer of `node`, `0` when it has none.
    fn peer(
        &mut self,
        node: u32,
    ) -> Result<u32>;

    /// `Some(true)` when `addr` is outside every subnet of the bd behind the
    /// EPG `(vrf, pc_tag)`; `None` when that cannot be determined.
    fn offsubnet(
        &mut self,
        addr: &str,
        vrf: u32,
        pc_tag: &str,
    ) -> Result<Option<bool>>;
}

/// Worker-local lookup cache over the fabric object tables.
pub struct FabricCache {
    fabric: String,
    objects: Arc<dyn ObjectStore>,
    nodes: MultiIndexCache<NodeRecord>,
    tunnels: MultiIndexCache<TunnelRecord>,
    vpcs: MultiIndexCache<VpcRecord>,
    vnids: MultiIndexCache<VnidRecord>,
    epgs: MultiIndexCache<EpgRecord>,
    subnets: MultiIndexCache<SubnetList>,
    offsubnet: MultiIndexCache<OffSubnetVerdict>,
}

fn epg_key(
    vrf: u32,
    pc_tag: &str,
) -> String {
    format!("{vrf}/{pc_tag}")
}

impl FabricCache {
    pub fn new(
        fabric: &str,
        objects: Arc<dyn ObjectStore>,
        capacity: usize,
    ) -> Self {
        Self {
            fabric: fabric.to_string(),
            objects,
            nodes: MultiIndexCache::new(capacity),
            tunnels: MultiIndexCache::new(capacity),
            vpcs: MultiIndexCache::new(capacity),
            vnids: MultiIndexCache::new(capacity),
            epgs: MultiIndexCache::new(capacity),
            subnets: MultiIndexCache::new(capacity),
            offsubnet: MultiIndexCache::new(capacity),
        }
    }

    pub fn node(
        &mut self,
        id: u32,
    ) -> Result<Option<NodeRecord>> {
        let (objects, fabric) = (&self.objects, &self.fabric);
        self.nodes.get_or_load(&id.to_string(), || {
            Ok(match objects.get_object(fabric, ObjectTable::Node, &id.to_string())? {
                Some(FabricObject::Node(n)) => Some(n),
                _ => None,
            })
        })
    }

    /// Remote node (or vpc identity) behind a tunnel, `0` when unresolved.
    pub fn tunnel_remote(
        &mut self,
        node: u32,
        intf: &str,
    ) -> Result<u32> {
        let key = tunnel_key(node, intf);
        let (objects, fabric) = (&self.objects, &self.fabric);
        let tunnel = self.tunnels.get_or_load(&key, || {
            Ok(match objects.get_object(fabric, ObjectTable::Tunnel, &key)? {
                Some(FabricObject::Tunnel(t)) => Some(t),
                _ => None,
            })
        })?;
        Ok(tunnel.map(|t| t.remote).unwrap_or_default())
    }

    pub fn vpc_id(
        &mut self,
        node: u32,
        intf: &str,
    ) -> Result<Option<u32>> {
        let key = tunnel_key(node, intf);
        let (objects, fabric) = (&self.objects, &self.fabric);
        let vpc = self.vpcs.get_or_load(&key, || {
            Ok(match objects.get_object(fabric, ObjectTable::Vpc, &key)? {
                Some(FabricObject::Vpc(v)) => Some(v),
                _ => None,
            })
        })?;
        Ok(vpc.map(|v| v.vpc))
    }

    /// dn of the vrf or bd owning `vnid`.
    pub fn vnid_name(
        &mut self,
        vnid: u32,
    ) -> Result<Option<String>> {
        let (objects, fabric) = (&self.objects, &self.fabric);
        let record = self.vnids.get_or_load(&vnid.to_string(), || {
            Ok(match objects.get_object(fabric, ObjectTable::Vnid, &vnid.to_string())? {
                Some(FabricObject::Vnid(v)) => Some(v),
                _ => None,
            })
        })?;
        Ok(record.map(|v| v.name))
    }

    pub fn epg(
        &mut self,
        vrf: u32,
        pc_tag: &str,
    ) -> Result<Option<EpgRecord>> {
        let (objects, fabric) = (&self.objects, &self.fabric);
        self.epgs.get_or_load(&epg_key(vrf, pc_tag), || {
            Ok(objects
                .list_objects(fabric, ObjectTable::Epg)?
                .into_iter()
                .find_map(|o| match o {
                    FabricObject::Epg(e) if e.vrf == vrf && e.pc_tag == pc_tag => Some(e),
                    _ => None,
                }))
        })
    }

    pub fn subnets(
        &mut self,
        bd_vnid: u32,
    ) -> Result<Vec<SubnetRecord>> {
        let (objects, fabric) = (&self.objects, &self.fabric);
        let list = self.subnets.get_or_load(&bd_vnid.to_string(), || {
            let subnets: Vec<SubnetRecord> = objects
                .list_objects(fabric, ObjectTable::Subnet)?
                .into_iter()
                .filter_map(|o| match o {
                    FabricObject::Subnet(s) if s.bd_vnid == bd_vnid => Some(s),
                    _ => None,
                })
                .collect();
            Ok(Some(SubnetList { bd_vnid, subnets }))
        })?;
        Ok(list.map(|l| l.subnets).unwrap_or_default())
    }

    /// Fills derived fields of a freshly parsed event: remote node of a
    /// tunnel, vpc interface name, EPG and vnid names.
    pub fn resolve_event(
        &mut self,
        event: &mut Event,
    ) -> Result<()> {
        if event.intf_id.starts_with("tunnel") && !event.is_local() {
            event.remote = self.tunnel_remote(event.node, &event.intf_id)?;
        }
        if event.is_local()
            && event.flags.contains(EndpointFlags::VPC_ATTACHED)
            && event.intf_id.starts_with("po")
        {
            if let Some(vpc) = self.vpc_id(event.node, &event.intf_id)? {
                event.intf_name = format!("vpc-{vpc}");
            }
        }
        if !event.pc_tag.is_empty() && event.pc_tag != PC_TAG_ANY {
            if let Some(epg) = self.epg(event.vrf, &event.pc_tag)? {
                event.epg_name = epg.name;
            }
        }
        let vnid = if event.key.is_ip() {
            event.vrf
        } else {
            event.bd
        };
        if let Some(name) = self.vnid_name(vnid)? {
            event.vnid_name = name;
        }
        trace!("resolved {}", event);
        Ok(())
    }

    pub fn flush(
        &mut self,
        flush: &CacheFlush,
    ) {
        let Some(name) = flush.name.as_deref() else {
            self.collection(flush.collection).flush_all();
            if matches!(flush.collection, CacheCollection::Epg | CacheCollection::Subnet) {
                self.offsubnet.flush_all();
            }
            return;
        };
        let removed = self.collection(flush.collection).flush_name(name);
        if matches!(flush.collection, CacheCollection::Epg | CacheCollection::Subnet) {
            self.offsubnet.flush_name(name);
        }
        trace!("flushed {:?} {} -> {:?}", flush.collection, name, removed);
    }

    pub fn flush_all(&mut self) {
        for c in [
            CacheCollection::Node,
            CacheCollection::Tunnel,
            CacheCollection::Vpc,
            CacheCollection::Vnid,
            CacheCollection::Epg,
            CacheCollection::Subnet,
            CacheCollection::OffSubnet,
        ] {
            self.collection(c).flush_all();
        }
    }

    fn collection(
        &mut self,
        c: CacheCollection,
    ) -> &mut dyn FlushAll {
        match c {
            CacheCollection::Node => &mut self.nodes,
            CacheCollection::Tunnel => &mut self.tunnels,
            CacheCollection::Vpc => &mut self.vpcs,
            CacheCollection::Vnid => &mut self.vnids,
            CacheCollection::Epg => &mut self.epgs,
            CacheCollection::Subnet => &mut self.subnets,
            CacheCollection::OffSubnet => &mut self.offsubnet,
        }
    }
}

/// Type-erased flush access to a collection.
trait FlushAll {
    fn flush_all(&mut self);
    fn flush_name(
        &mut self,
        name: &str,
    ) -> Vec<String>;
}

impl<V: CacheItem> FlushAll for MultiIndexCache<V> {
    fn flush_all(&mut self) {
        MultiIndexCache::flush_all(self)
    }

    fn flush_name(
        &mut self,
        name: &str,
    ) -> Vec<String> {
        MultiIndexCache::flush_name(self, name)
    }
}

impl TopologyView for FabricCache {
    fn peer(
        &mut self,
        node: u32,
    ) -> Result<u32> {
        Ok(self.node(node)?.map(|n| n.peer).unwrap_or_default())
    }

    fn offsubnet(
        &mut self,
        addr: &str,
        vrf: u32,
        pc_tag: &str,
    ) -> Result<Option<bool>> {
        let key = format!("{}/{}", epg_key(vrf, pc_tag), addr);
        if let super::Cached::Hit(v) = self.offsubnet.search(&key) {
            return Ok(v.outside);
        }

        let mut derived_from = vec![epg_key(vrf, pc_tag)];
        let outside = match self.epg(vrf, pc_tag)? {
            Some(epg) if epg.bd_vnid != crate::UNRESOLVED => {
                derived_from.push(epg.name.clone());
                derived_from.push(epg.bd_vnid.to_string());
                let subnets = self.subnets(epg.bd_vnid)?;
                derived_from.extend(subnets.iter().map(|s| s.name.clone()));
                let prefixes: Vec<String> = subnets.into_iter().map(|s| s.ip).collect();
                outside_all(addr, &prefixes)
            }
            Some(epg) => {
                derived_from.push(epg.name);
                None
            }
            None => None,
        };
        self.offsubnet.insert(
            &key,
            OffSubnetVerdict {
                outside,
                derived_from,
            },
        );
        Ok(outside)
    }
}

/// Cache flushes required after a dependency sync mutated `derived`.
pub fn invalidations(derived: &DerivedObject) -> Vec<CacheFlush> {
    let flush = |collection, name: String| CacheFlush {
        collection,
        name: Some(name),
    };
    match derived.table {
        ObjectTable::Mo(_) => Vec::new(),
        ObjectTable::Node => vec![flush(CacheCollection::Node, derived.name.clone())],
        ObjectTable::Tunnel => vec![flush(CacheCollection::Tunnel, derived.name.clone())],
        ObjectTable::Vpc => vec![flush(CacheCollection::Vpc, derived.name.clone())],
        ObjectTable::Vnid => vec![flush(CacheCollection::Vnid, derived.name.clone())],
        ObjectTable::Epg => {
            let mut v = vec![flush(CacheCollection::Epg, derived.name.clone())];
            if let Some(FabricObject::Epg(e)) = &derived.object {
                v.push(flush(CacheCollection::Epg, epg_key(e.vrf, &e.pc_tag)));
            }
            v
        }
        ObjectTable::Subnet => {
            let mut v = vec![flush(CacheCollection::Subnet, derived.name.clone())];
            if let Some(FabricObject::Subnet(s)) = &derived.object {
                if s.bd_vnid != crate::UNRESOLVED {
                    v.push(flush(CacheCollection::Subnet, s.bd_vnid.to_string()));
                }
            }
            v
        }
    }
}
