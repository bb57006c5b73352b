//! Behaviour every [`HistoryStore`]/[`ObjectStore`] implementation must share.

use super::*;
use crate::AnomalyEvent;
use crate::AnomalyKind;
use crate::ConfigClass;
use crate::EpgRecord;
use crate::EventStatus;
use crate::FabricObject;
use crate::HistoryStore;
use crate::LedgerFlag;
use crate::MoveDelta;
use crate::ObjectStore;
use crate::ObjectTable;
use crate::StaleSnapshot;

pub fn check_append_rotates(store: &dyn HistoryStore) {
    let key = mac_key();
    for i in 0..10 {
        let e = EventBuilder::new(key.clone(), 101, i as f64).local("eth1/1").build();
        store.append_event(&e, 4).unwrap();
    }
    let ledgers = store.read_latest(&key, Some(101), 64).unwrap();
    assert_eq!(ledgers.len(), 1);
    assert_eq!(ledgers[0].events.len(), 4);
    assert_eq!(ledgers[0].count, 10);
    assert_eq!(ledgers[0].events[0].ts, 9.0);
    assert_eq!(ledgers[0].events[3].ts, 6.0);
}

pub fn check_read_latest_all_nodes_and_slice(store: &dyn HistoryStore) {
    let key = ip_key();
    for node in [103, 101, 102] {
        for ts in [1.0, 2.0, 3.0] {
            let e = EventBuilder::new(key.clone(), node, ts).local("eth1/1").build();
            store.append_event(&e, 64).unwrap();
        }
    }
    let ledgers = store.read_latest(&key, None, 2).unwrap();
    let nodes: Vec<u32> = ledgers.iter().map(|l| l.node).collect();
    assert_eq!(nodes, vec![101, 102, 103]);
    assert!(ledgers.iter().all(|l| l.events.len() == 2 && l.count == 3));

    assert!(store.read_latest(&mac_key(), None, 2).unwrap().is_empty());
}

pub fn check_flags(store: &dyn HistoryStore) {
    let key = mac_key();
    assert!(!store.set_flag(&key, 101, LedgerFlag::Stale, true).unwrap());

    let e = EventBuilder::new(key.clone(), 101, 1.0).local("eth1/1").build();
    store.append_event(&e, 64).unwrap();
    assert!(store.set_flag(&key, 101, LedgerFlag::Stale, true).unwrap());
    let ledger = &store.read_latest(&key, Some(101), 1).unwrap()[0];
    assert!(ledger.is_stale);
    assert!(!ledger.is_offsubnet);

    // flag survives further appends
    let e = EventBuilder::new(key.clone(), 101, 2.0)
        .local("eth1/1")
        .status(EventStatus::Deleted)
        .build();
    store.append_event(&e, 64).unwrap();
    assert!(store.read_latest(&key, Some(101), 1).unwrap()[0].is_stale);
}

pub fn check_anomalies_and_summary(store: &dyn HistoryStore) {
    let key = mac_key();
    let src = EventBuilder::new(key.clone(), 101, 1.0).local("eth1/1").build();
    let dst = EventBuilder::new(key.clone(), 102, 2.0).local("eth1/2").build();
    let delta = MoveDelta { src, dst: dst.clone() };

    assert_eq!(store.push_anomaly(&key, AnomalyEvent::Move(delta.clone()), 2).unwrap(), 1);
    assert_eq!(store.push_anomaly(&key, AnomalyEvent::Move(delta.clone()), 2).unwrap(), 2);
    assert_eq!(store.push_anomaly(&key, AnomalyEvent::Move(delta.clone()), 2).unwrap(), 3);
    let record = store.read_anomaly(&key, AnomalyKind::Move, 0).unwrap().unwrap();
    assert_eq!(record.events.len(), 2);
    assert_eq!(
        store.latest_anomaly(&key, AnomalyKind::Move, 0).unwrap(),
        Some(AnomalyEvent::Move(delta))
    );

    let stale = StaleSnapshot {
        node: 103,
        remote: 104,
        expected_remote: 0,
        ts: 5.0,
        event: dst.clone(),
    };
    store.push_anomaly(&key, AnomalyEvent::Stale(stale), 8).unwrap();
    assert!(store.latest_anomaly(&key, AnomalyKind::Stale, 103).unwrap().is_some());
    assert!(store.latest_anomaly(&key, AnomalyKind::Stale, 104).unwrap().is_none());

    assert_eq!(store.push_endpoint_event(&key, dst.clone(), 4).unwrap(), 1);
    let summary = store.read_endpoint(&key).unwrap().unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.latest(), Some(&dst));
}

pub fn check_delete_and_node_index(store: &dyn HistoryStore) {
    let key = mac_key();
    let other = ip_key();
    for (k, node) in [(&key, 101), (&key, 102), (&other, 102)] {
        let e = EventBuilder::new(k.clone(), node, 1.0).local("eth1/1").build();
        store.append_event(&e, 64).unwrap();
    }
    store.push_endpoint_event(&key, EventBuilder::new(key.clone(), 101, 1.0).build(), 4).unwrap();

    assert_eq!(store.keys_on_node(FABRIC, 101).unwrap(), vec![key.clone()]);
    let mut on_102 = store.keys_on_node(FABRIC, 102).unwrap();
    on_102.sort();
    let mut expected = vec![key.clone(), other.clone()];
    expected.sort();
    assert_eq!(on_102, expected);
    assert!(store.keys_on_node("other-fabric", 102).unwrap().is_empty());

    assert_eq!(store.delete_endpoint(&key).unwrap(), 3);
    assert!(store.read_latest(&key, None, 64).unwrap().is_empty());
    assert!(store.read_endpoint(&key).unwrap().is_none());
    assert_eq!(store.read_latest(&other, None, 64).unwrap().len(), 1);
}

pub fn check_objects(store: &dyn ObjectStore) {
    let epg = |name: &str, bd_vnid: u32| {
        FabricObject::Epg(EpgRecord {
            name: name.to_string(),
            vrf: VRF,
            pc_tag: "32770".to_string(),
            bd: "uni/tn-t1/BD-bd1".to_string(),
            bd_vnid,
        })
    };
    store
        .bulk_upsert(
            FABRIC,
            ObjectTable::Epg,
            vec![epg("uni/tn-t1/ap-a/epg-e1", BD), epg("uni/tn-t1/ap-a/epg-e2", BD)],
        )
        .unwrap();
    store
        .bulk_upsert(FABRIC, ObjectTable::Epg, vec![epg("uni/tn-t1/ap-a/epg-e1", 0)])
        .unwrap();

    assert_eq!(
        store.get_object(FABRIC, ObjectTable::Epg, "uni/tn-t1/ap-a/epg-e1").unwrap(),
        Some(epg("uni/tn-t1/ap-a/epg-e1", 0))
    );
    assert_eq!(store.list_objects(FABRIC, ObjectTable::Epg).unwrap().len(), 2);
    assert!(store.list_objects("other", ObjectTable::Epg).unwrap().is_empty());
    assert!(store
        .list_objects(FABRIC, ObjectTable::Mo(ConfigClass::FvAEPg))
        .unwrap()
        .is_empty());

    let removed = store
        .delete_objects(
            FABRIC,
            ObjectTable::Epg,
            &["uni/tn-t1/ap-a/epg-e2".to_string(), "missing".to_string()],
        )
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.list_objects(FABRIC, ObjectTable::Epg).unwrap().len(), 1);
}
