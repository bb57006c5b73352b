use super::*;
use crate::test_utils::*;
use crate::EndpointFlags;
use crate::Event;
use crate::EventStatus;
use crate::HistoryLedger;

/// Ledger holding `events` given oldest first.
fn ledger(events: Vec<Event>) -> HistoryLedger {
    let mut l = HistoryLedger::new(events[0].key.clone(), events[0].node);
    for e in events {
        l.push(e, 64);
    }
    l
}

fn deleted(
    ts: f64,
    key: crate::EndpointKey,
) -> Event {
    EventBuilder::new(key, 101, ts)
        .status(EventStatus::Deleted)
        .build()
}

#[test]
fn test_returns_two_newest_placements() {
    let l = ledger(vec![
        EventBuilder::new(mac_key(), 101, 1.0).local("eth1/1").build(),
        EventBuilder::new(mac_key(), 101, 2.0).local("eth1/2").build(),
        EventBuilder::new(mac_key(), 101, 3.0).local("eth1/3").build(),
    ]);
    let events = last_events(&l, 3.0);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].intf_id, "eth1/3");
    assert_eq!(events[1].intf_id, "eth1/2");
}

#[test]
fn test_transitory_delete_is_skipped() {
    let l = ledger(vec![
        EventBuilder::new(mac_key(), 101, 1.0).local("eth1/1").build(),
        deleted(9.0, mac_key()),
        EventBuilder::new(mac_key(), 101, 10.0).local("eth1/2").build(),
    ]);
    let events = last_events(&l, 3.0);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].intf_id, "eth1/2");
    assert_eq!(events[1].intf_id, "eth1/1");
}

#[test]
fn test_old_delete_and_leading_delete_are_kept() {
    let l = ledger(vec![
        EventBuilder::new(mac_key(), 101, 1.0).local("eth1/1").build(),
        deleted(2.0, mac_key()),
        EventBuilder::new(mac_key(), 101, 10.0).local("eth1/2").build(),
    ]);
    let events = last_events(&l, 3.0);
    assert!(events[1].is_deleted());

    let l = ledger(vec![
        EventBuilder::new(mac_key(), 101, 1.0).local("eth1/1").build(),
        deleted(2.0, mac_key()),
    ]);
    let events = last_events(&l, 3.0);
    assert!(events[0].is_deleted());
    assert_eq!(events[1].intf_id, "eth1/1");
}

#[test]
fn test_cached_unspecified_and_provisional_are_skipped() {
    let l = ledger(vec![
        EventBuilder::new(ip_key(), 101, 1.0)
            .local("eth1/1")
            .rewrite(MAC, BD)
            .build(),
        EventBuilder::new(ip_key(), 101, 2.0).local("eth1/2").build(),
        EventBuilder::new(ip_key(), 101, 3.0)
            .local("eth1/3")
            .rewrite(MAC, BD)
            .flags(EndpointFlags::CACHED)
            .build(),
        EventBuilder::new(ip_key(), 101, 4.0)
            .local("unspecified")
            .rewrite(MAC, BD)
            .build(),
    ]);
    let events = last_events(&l, 3.0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].intf_id, "eth1/1");
    assert!(events
        .iter()
        .all(|e| !e.flags.contains(EndpointFlags::CACHED) && !e.intf_id.is_empty()));
}

#[test]
fn test_remote_duplicate_with_new_rewrite_mac_is_skipped() {
    let l = ledger(vec![
        EventBuilder::new(ip_key(), 103, 1.0)
            .remote(101, "tunnel7")
            .rewrite("00:00:00:00:00:01", BD)
            .build(),
        EventBuilder::new(ip_key(), 103, 2.0)
            .remote(101, "tunnel7")
            .rewrite("00:00:00:00:00:02", BD)
            .build(),
        EventBuilder::new(ip_key(), 103, 3.0)
            .remote(102, "tunnel8")
            .build(),
    ]);
    let events = last_events(&l, 3.0);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].remote, 102);
    assert_eq!(events[1].rw_mac, "00:00:00:00:00:02");

    let l = ledger(vec![
        EventBuilder::new(ip_key(), 103, 1.0)
            .remote(101, "tunnel7")
            .rewrite("00:00:00:00:00:01", BD)
            .build(),
        EventBuilder::new(ip_key(), 103, 2.0)
            .remote(101, "tunnel7")
            .rewrite("00:00:00:00:00:02", BD)
            .build(),
    ]);
    let events = last_events(&l, 3.0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ts, 2.0);
}
