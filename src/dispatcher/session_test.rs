use super::*;
use crate::test_utils::*;
use crate::CapacityError;
use crate::EndpointKey;
use crate::Error;
use crate::JobDone;

fn key(n: u32) -> EndpointKey {
    EndpointKey::ip(FABRIC, &format!("10.0.0.{n}"), VRF)
}

fn done(
    worker: usize,
    key: EndpointKey,
    session: u64,
) -> JobDone {
    JobDone { worker, key, session }
}

#[test]
fn test_key_sticks_to_worker_while_session_open() {
    let mut table = SessionTable::new(3, 100, 8, 3);
    assert_eq!(table.admit(&key(1)).unwrap(), Admission::Assigned(0));
    assert_eq!(table.admit(&key(2)).unwrap(), Admission::Assigned(1));
    assert_eq!(table.admit(&key(1)).unwrap(), Admission::Assigned(0));
    assert_eq!(table.session(&key(1)), Some((0, 2)));
    assert_eq!(table.load(0), 2);
    assert_eq!(table.total(), 3);
}

#[test]
fn test_closed_session_is_reassigned_to_least_loaded() {
    let mut table = SessionTable::new(2, 100, 8, 3);
    table.admit(&key(1)).unwrap();
    table.admit(&key(2)).unwrap();
    table.admit(&key(2)).unwrap();
    let generation = table.generation(&key(1)).unwrap();
    table.complete(&done(0, key(1), generation));
    assert_eq!(table.session(&key(1)), None);

    // worker 0 is idle, worker 1 still holds key 2
    assert_eq!(table.admit(&key(1)).unwrap(), Admission::Assigned(0));
    assert_eq!(table.admit(&key(3)).unwrap(), Admission::Assigned(0));
}

#[test]
fn test_key_backlog_throttles_then_escalates() {
    let mut table = SessionTable::new(2, 100, 2, 3);
    table.admit(&key(1)).unwrap();
    table.admit(&key(1)).unwrap();

    assert_eq!(
        table.admit(&key(1)).unwrap(),
        Admission::Throttled {
            worker: 0,
            outstanding: 2
        }
    );
    assert!(matches!(table.admit(&key(1)).unwrap(), Admission::Throttled { .. }));
    assert_eq!(
        table.admit(&key(1)).unwrap(),
        Admission::Escalate {
            worker: 0,
            attempts: 3
        }
    );
    assert_eq!(table.session(&key(1)), None);
    // the failure job is outstanding on worker 0
    assert_eq!(table.load(0), 3);
}

#[test]
fn test_global_backlog_is_an_error() {
    let mut table = SessionTable::new(2, 2, 8, 3);
    table.admit(&key(1)).unwrap();
    table.admit(&key(2)).unwrap();
    let err = table.admit(&key(3)).unwrap_err();
    assert!(matches!(
        err,
        Error::Capacity(CapacityError::GlobalBacklog { outstanding: 2, limit: 2 })
    ));
    assert!(err.is_fatal());
}

#[test]
fn test_completion_from_other_generation_keeps_session() {
    let mut table = SessionTable::new(2, 100, 8, 3);
    table.admit(&key(1)).unwrap();
    table.complete(&done(1, key(1), 0));
    assert_eq!(table.session(&key(1)), Some((0, 1)));
    assert_eq!(table.total(), 0);
}

#[test]
fn test_late_completion_after_escalation_spares_new_session() {
    let mut table = SessionTable::new(1, 100, 1, 1);
    table.admit(&key(1)).unwrap();
    let old = table.generation(&key(1)).unwrap();
    assert_eq!(
        table.admit(&key(1)).unwrap(),
        Admission::Escalate {
            worker: 0,
            attempts: 1
        }
    );

    // new session lands on the same worker
    assert_eq!(table.admit(&key(1)).unwrap(), Admission::Assigned(0));
    let current = table.generation(&key(1)).unwrap();
    assert_ne!(old, current);

    // the job admitted under the first session finishes late
    table.complete(&done(0, key(1), old));
    assert_eq!(table.session(&key(1)), Some((0, 1)));
    table.complete(&done(0, key(1), current));
    assert_eq!(table.session(&key(1)), None);
}
