use super::*;

fn event(ts: f64) -> Event {
    let key = EndpointKey::mac("fab1", "00:00:00:00:00:01", 1);
    Event::new(key, 101, ts, EventStatus::Created, SourceClass::MacEp)
}

#[test]
fn test_push_is_most_recent_first_and_capped() {
    let key = EndpointKey::mac("fab1", "00:00:00:00:00:01", 1);
    let mut ledger = HistoryLedger::new(key, 101);
    for i in 0..10 {
        ledger.push(event(i as f64), 4);
    }

    assert_eq!(ledger.events.len(), 4);
    assert_eq!(ledger.count, 10);
    assert_eq!(ledger.latest().map(|e| e.ts), Some(9.0));
    assert_eq!(ledger.oldest_ts(), Some(6.0));
}

#[test]
fn test_current_skips_deleted_latest() {
    let key = EndpointKey::mac("fab1", "00:00:00:00:00:01", 1);
    let mut ledger = HistoryLedger::new(key, 101);
    ledger.push(event(1.0), 8);
    assert!(ledger.current().is_some());

    let mut deleted = event(2.0);
    deleted.status = EventStatus::Deleted;
    ledger.push(deleted, 8);
    assert!(ledger.current().is_none());
    assert!(ledger.latest().is_some());
}

#[test]
fn test_flags_and_slice() {
    let key = EndpointKey::mac("fab1", "00:00:00:00:00:01", 1);
    let mut ledger = HistoryLedger::new(key, 101);
    ledger.push(event(1.0), 8);
    ledger.push(event(2.0), 8);

    ledger.set_flag(LedgerFlag::Stale, true);
    assert!(ledger.flag(LedgerFlag::Stale));
    assert!(!ledger.flag(LedgerFlag::OffSubnet));

    let sliced = ledger.sliced(1);
    assert_eq!(sliced.events.len(), 1);
    assert_eq!(sliced.count, 2);
}

#[test]
fn test_placement_differs_ignores_names() {
    let a = event(1.0);
    let mut b = event(2.0);
    b.epg_name = "uni/tn-t1/ap-a1/epg-e1".to_string();
    assert!(!a.placement_differs(&b));
    b.intf_id = "eth1/1".to_string();
    assert!(a.placement_differs(&b));
}
