//! Component-level walk-throughs of the reference scenarios, wired the way
//! a worker wires them: parse, resolve, merge, analyze.

use ept_engine::analyze_key;
use ept_engine::analyze_stale;
use ept_engine::invalidations;
use ept_engine::parse_config;
use ept_engine::persist_move;
use ept_engine::vpc_node_id;
use ept_engine::AnalysisConfig;
use ept_engine::AnomalyKind;
use ept_engine::ConfigClass;
use ept_engine::DerivedChange;
use ept_engine::FabricObject;
use ept_engine::HistoryLedger;
use ept_engine::HistoryStore;
use ept_engine::ObjectStore;
use ept_engine::ObjectTable;
use ept_engine::RawRecord;
use ept_engine::Reconciler;
use ept_engine::Stores;
use ept_engine::TopologyView;
use ept_engine::WatchRequest;
use ept_engine::NO_LOCAL_NODE;
use ept_engine::UNRESOLVED;

use crate::common::*;

fn setup() -> (Stores, Reconciler) {
    let stores = Stores::in_memory();
    build_topology(&stores, &fabric_config());
    let reconciler = Reconciler::new(stores.history.clone(), 64);
    (stores, reconciler)
}

fn ledgers(
    stores: &Stores,
    key: &ept_engine::EndpointKey,
) -> Vec<HistoryLedger> {
    stores.history.read_latest(key, None, 64).unwrap()
}

#[test]
fn test_local_vpc_mac_creates_one_clean_ledger() {
    let (stores, reconciler) = setup();
    let mut cache = cache(&stores);

    let event = resolved(&mut cache, &vpc_mac(101, 10.0));
    assert_eq!(event.intf_name, "vpc-384");
    assert_eq!(event.epg_name, EPG_DN);
    assert_eq!(event.vnid_name, BD_DN);

    let outcome = reconciler.merge(event).unwrap();
    assert!(outcome.updated && outcome.analyze);
    let ledger = ledgers(&stores, &mac_key()).remove(0);
    assert_eq!(ledger.node, 101);
    assert_eq!(ledger.count, 1);
    assert!(!ledger.is_stale);

    let analysis = analyze_key(stores.history.as_ref(), &mut cache, &mac_key(), &AnalysisConfig::default()).unwrap();
    assert!(analysis.moved.is_none());
    assert!(analysis.watch.is_empty());
}

#[test]
fn test_ip_waits_for_its_rewrite_before_analysis() {
    let (stores, reconciler) = setup();
    let mut cache = cache(&stores);
    let config = AnalysisConfig::default();

    let outcome = reconciler.merge(resolved(&mut cache, &local_ip(101, 10.0))).unwrap();
    assert!(outcome.updated);
    assert!(!outcome.analyze);
    assert_eq!(ledgers(&stores, &ip_key()).len(), 1);
    assert!(stores.history.read_endpoint(&ip_key()).unwrap().is_none());

    let outcome = reconciler.merge(resolved(&mut cache, &rewrite(101, 11.0))).unwrap();
    assert!(outcome.analyze);
    analyze_key(stores.history.as_ref(), &mut cache, &ip_key(), &config).unwrap();

    let summary = stores.history.read_endpoint(&ip_key()).unwrap().unwrap();
    assert_eq!(summary.events.len(), 1);
    let latest = summary.latest().unwrap();
    assert_eq!(latest.rw_mac, MAC);
    assert_eq!(latest.node, 101);
}

#[test]
fn test_move_between_vpc_domains_is_recorded_once() {
    let (stores, reconciler) = setup();
    let mut cache = cache(&stores);
    let config = AnalysisConfig::default();
    assert_eq!(cache.peer(101).unwrap(), 102);

    for record in [vpc_mac(101, 10.0), vpc_mac(103, 20.0)] {
        reconciler.merge(resolved(&mut cache, &record)).unwrap();
    }
    let outcome = analyze_key(stores.history.as_ref(), &mut cache, &mac_key(), &config).unwrap();
    let delta = outcome.moved.unwrap();
    assert_eq!(delta.src.node, vpc_node_id(101, 102));
    assert_eq!(delta.dst.node, vpc_node_id(103, 104));

    assert!(!persist_move(stores.history.as_ref(), &mac_key(), &delta, 64).unwrap());
    let again = analyze_key(stores.history.as_ref(), &mut cache, &mac_key(), &config).unwrap();
    assert!(again.moved.is_none());
    let record = stores
        .history
        .read_anomaly(&mac_key(), AnomalyKind::Move, 0)
        .unwrap()
        .unwrap();
    assert_eq!(record.count, 1);
}

#[test]
fn test_remote_pointing_at_empty_node_is_stale() {
    let (stores, reconciler) = setup();
    let mut cache = cache(&stores);

    let event = resolved(&mut cache, &remote_ip(103, "tunnel7", 10.0));
    assert_eq!(event.remote, 104);
    reconciler.merge(event).unwrap();

    let stale = analyze_stale(&ip_key(), &ledgers(&stores, &ip_key()), &mut cache, 4).unwrap();
    assert_eq!(stale.keys().copied().collect::<Vec<_>>(), vec![103]);
    assert_eq!(stale[&103].remote, 104);
    assert_eq!(stale[&103].expected_remote, NO_LOCAL_NODE);

    let outcome = analyze_key(stores.history.as_ref(), &mut cache, &ip_key(), &AnalysisConfig::default()).unwrap();
    assert!(matches!(
        outcome.watch.as_slice(),
        [WatchRequest::Stale { snapshot, .. }] if snapshot.node == 103
    ));
    assert!(ledgers(&stores, &ip_key())[0].is_stale);
}

#[test]
fn test_deleted_bd_resets_dependents_without_deleting_them() {
    let stores = Stores::in_memory();
    let graph = build_topology(&stores, &fabric_config());
    let mut cache = cache(&stores);
    assert_eq!(cache.offsubnet("10.9.9.9", VRF, "32770").unwrap(), Some(true));

    let deleted = RawRecord::new(ConfigClass::FvBD.as_class(), 2.0)
        .with_attr("dn", BD_DN)
        .with_attr("seg", "15007730")
        .with_attr("status", "deleted");
    let changes = graph.sync(FABRIC, &parse_config(&deleted).unwrap()).unwrap();
    assert!(changes
        .iter()
        .any(|c| c.table == ObjectTable::Epg && c.change == DerivedChange::Reset));

    match stores.objects.get_object(FABRIC, ObjectTable::Epg, EPG_DN).unwrap() {
        Some(FabricObject::Epg(epg)) => {
            assert_eq!(epg.bd_vnid, UNRESOLVED);
            assert_eq!(epg.bd, BD_DN);
        }
        other => panic!("epg missing after bd delete: {other:?}"),
    }
    match stores.objects.get_object(FABRIC, ObjectTable::Subnet, SUBNET_DN).unwrap() {
        Some(FabricObject::Subnet(subnet)) => assert_eq!(subnet.bd_vnid, UNRESOLVED),
        other => panic!("subnet missing after bd delete: {other:?}"),
    }

    for change in &changes {
        for flush in invalidations(change) {
            cache.flush(&flush);
        }
    }
    assert_eq!(cache.offsubnet("10.9.9.9", VRF, "32770").unwrap(), None);
}
