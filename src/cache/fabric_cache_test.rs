use std::sync::Arc;

use super::*;
use crate::test_utils::*;
use crate::CacheCollection;
use crate::CacheFlush;
use crate::DerivedObject;
use crate::EndpointFlags;
use crate::EpgRecord;
use crate::FabricObject;
use crate::MemStore;
use crate::NodeRecord;
use crate::NodeState;
use crate::ObjectStore;
use crate::ObjectTable;
use crate::SubnetRecord;
use crate::TunnelRecord;
use crate::VnidKind;
use crate::VnidRecord;
use crate::VpcRecord;

const EPG: &str = "uni/tn-t1/ap-a1/epg-e1";

fn seeded_store() -> Arc<MemStore> {
    let store = Arc::new(MemStore::new());
    store
        .bulk_upsert(
            FABRIC,
            ObjectTable::Node,
            vec![FabricObject::Node(NodeRecord {
                id: 101,
                name: "leaf101".to_string(),
                address: "10.0.72.64".to_string(),
                state: NodeState::Active,
                peer: 102,
            })],
        )
        .unwrap();
    store
        .bulk_upsert(
            FABRIC,
            ObjectTable::Tunnel,
            vec![FabricObject::Tunnel(TunnelRecord {
                node: 103,
                intf: "tunnel7".to_string(),
                dest: "10.0.72.64".to_string(),
                remote: 101,
            })],
        )
        .unwrap();
    store
        .bulk_upsert(
            FABRIC,
            ObjectTable::Vpc,
            vec![FabricObject::Vpc(VpcRecord {
                node: 101,
                intf: "po2".to_string(),
                vpc: 384,
            })],
        )
        .unwrap();
    store
        .bulk_upsert(
            FABRIC,
            ObjectTable::Vnid,
            vec![FabricObject::Vnid(VnidRecord {
                vnid: VRF,
                name: "uni/tn-t1/ctx-v1".to_string(),
                kind: VnidKind::Vrf,
            })],
        )
        .unwrap();
    store
        .bulk_upsert(
            FABRIC,
            ObjectTable::Epg,
            vec![FabricObject::Epg(EpgRecord {
                name: EPG.to_string(),
                vrf: VRF,
                pc_tag: "32770".to_string(),
                bd: "uni/tn-t1/BD-bd1".to_string(),
                bd_vnid: BD,
            })],
        )
        .unwrap();
    store
        .bulk_upsert(
            FABRIC,
            ObjectTable::Subnet,
            vec![FabricObject::Subnet(subnet("uni/tn-t1/BD-bd1/subnet-[10.1.1.1/24]", "10.1.1.1/24"))],
        )
        .unwrap();
    store
}

fn subnet(
    name: &str,
    ip: &str,
) -> SubnetRecord {
    SubnetRecord {
        name: name.to_string(),
        ip: ip.to_string(),
        parent: "uni/tn-t1/BD-bd1".to_string(),
        bd_vnid: BD,
    }
}

#[test]
fn test_resolve_local_vpc_event() {
    let store = seeded_store();
    let mut cache = FabricCache::new(FABRIC, store, 64);
    let mut event = EventBuilder::new(ip_key(), 101, 1.0)
        .local("po2")
        .flags(EndpointFlags::VPC_ATTACHED)
        .build();

    cache.resolve_event(&mut event).unwrap();
    assert_eq!(event.intf_name, "vpc-384");
    assert_eq!(event.epg_name, EPG);
    assert_eq!(event.vnid_name, "uni/tn-t1/ctx-v1");
}

#[test]
fn test_resolve_remote_tunnel() {
    let store = seeded_store();
    let mut cache = FabricCache::new(FABRIC, store, 64);
    let mut event = EventBuilder::new(ip_key(), 103, 1.0).remote(0, "tunnel7").build();
    cache.resolve_event(&mut event).unwrap();
    assert_eq!(event.remote, 101);

    let mut unknown = EventBuilder::new(ip_key(), 103, 1.0).remote(0, "tunnel9").build();
    cache.resolve_event(&mut unknown).unwrap();
    assert_eq!(unknown.remote, 0);
}

#[test]
fn test_peer_lookup() {
    let mut cache = FabricCache::new(FABRIC, seeded_store(), 64);
    assert_eq!(cache.peer(101).unwrap(), 102);
    assert_eq!(cache.peer(105).unwrap(), 0);
}

#[test]
fn test_offsubnet_verdicts() {
    let mut cache = FabricCache::new(FABRIC, seeded_store(), 64);
    assert_eq!(cache.offsubnet("10.1.1.5", VRF, "32770").unwrap(), Some(false));
    assert_eq!(cache.offsubnet("10.2.2.5", VRF, "32770").unwrap(), Some(true));
    // no v6 subnet configured
    assert_eq!(cache.offsubnet("2001:db8::5", VRF, "32770").unwrap(), None);
    // unknown epg
    assert_eq!(cache.offsubnet("10.2.2.5", VRF, "49153").unwrap(), None);
}

#[test]
fn test_subnet_flush_reaches_offsubnet_results() {
    let store = seeded_store();
    let mut cache = FabricCache::new(FABRIC, store.clone(), 64);
    assert_eq!(cache.offsubnet("10.2.2.5", VRF, "32770").unwrap(), Some(true));

    // new subnet under the same bd, invisible until flushed
    let added = subnet("uni/tn-t1/BD-bd1/subnet-[10.2.2.1/24]", "10.2.2.1/24");
    store
        .bulk_upsert(FABRIC, ObjectTable::Subnet, vec![FabricObject::Subnet(added.clone())])
        .unwrap();
    assert_eq!(cache.offsubnet("10.2.2.5", VRF, "32770").unwrap(), Some(true));

    for flush in invalidations(&DerivedObject::upserted(FabricObject::Subnet(added))) {
        cache.flush(&flush);
    }
    assert_eq!(cache.offsubnet("10.2.2.5", VRF, "32770").unwrap(), Some(false));
}

#[test]
fn test_epg_flush_reaches_not_found_lookup() {
    let store = seeded_store();
    let mut cache = FabricCache::new(FABRIC, store.clone(), 64);
    assert!(cache.epg(VRF, "49153").unwrap().is_none());

    let epg = EpgRecord {
        name: "uni/tn-t1/ap-a1/epg-e2".to_string(),
        vrf: VRF,
        pc_tag: "49153".to_string(),
        bd: String::new(),
        bd_vnid: 0,
    };
    store
        .bulk_upsert(FABRIC, ObjectTable::Epg, vec![FabricObject::Epg(epg.clone())])
        .unwrap();
    for flush in invalidations(&DerivedObject::upserted(FabricObject::Epg(epg.clone()))) {
        cache.flush(&flush);
    }
    assert_eq!(cache.epg(VRF, "49153").unwrap(), Some(epg));
}

#[test]
fn test_collection_flush_all() {
    let store = seeded_store();
    let mut cache = FabricCache::new(FABRIC, store.clone(), 64);
    assert_eq!(cache.tunnel_remote(103, "tunnel7").unwrap(), 101);

    store
        .delete_objects(FABRIC, ObjectTable::Tunnel, &["103/tunnel7".to_string()])
        .unwrap();
    assert_eq!(cache.tunnel_remote(103, "tunnel7").unwrap(), 101);

    cache.flush(&CacheFlush {
        collection: CacheCollection::Tunnel,
        name: None,
    });
    assert_eq!(cache.tunnel_remote(103, "tunnel7").unwrap(), 0);
}
