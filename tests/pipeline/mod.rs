//! Full fabric task runs over an in-process transport.

use std::sync::Arc;
use std::time::Duration;

use ept_engine::vpc_node_id;
use ept_engine::AnomalyEvent;
use ept_engine::AnomalyKind;
use ept_engine::FabricTask;
use ept_engine::HistoryStore;
use ept_engine::NotificationKind;
use ept_engine::ObjectStore;
use ept_engine::ObjectTable;
use ept_engine::Settings;
use ept_engine::Stores;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::common::*;

fn settings() -> Settings {
    let mut s = Settings::default();
    s.fabric.name = FABRIC.to_string();
    s.dispatcher.workers = 2;
    s.analysis.stale_window_ms = 500;
    s.analysis.xr_stale_window_ms = 500;
    s.remediation.auto_clear_stale = true;
    s
}

struct Running {
    stores: Stores,
    sink: CollectingSink,
    remediation: CountingRemediation,
    feed: tokio::sync::mpsc::Sender<ept_engine::RawRecord>,
    shutdown: watch::Sender<()>,
    task: tokio::task::JoinHandle<ept_engine::Result<()>>,
}

/// Starts a task and waits until the initial build reached the object
/// tables.
async fn start() -> Running {
    let stores = Stores::in_memory();
    let sink = CollectingSink::default();
    let remediation = CountingRemediation::default();
    let (transport, feed) = ChannelTransport::new(fabric_config());
    let (shutdown, shutdown_rx) = watch::channel(());
    let s = settings();
    let reload = s.clone();
    let task = FabricTask::new(
        s,
        stores.clone(),
        Arc::new(transport),
        Arc::new(remediation.clone()),
        Arc::new(sink.clone()),
        shutdown_rx,
    )
    .with_settings_loader(Box::new(move || Ok(reload.clone())));
    let task = tokio::spawn(task.run());

    let objects = stores.objects.clone();
    eventually(move || {
        objects
            .get_object(FABRIC, ObjectTable::Subnet, SUBNET_DN)
            .map(|s| s.is_some())
            .unwrap_or(false)
    })
    .await;

    Running {
        stores,
        sink,
        remediation,
        feed,
        shutdown,
        task,
    }
}

async fn stop(running: Running) {
    running.shutdown.send(()).unwrap();
    timeout(Duration::from_secs(10), running.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_move_between_vpc_domains_is_notified() {
    let running = start().await;

    running.feed.send(vpc_mac(101, 10.0)).await.unwrap();
    let history = running.stores.history.clone();
    eventually(move || !history.read_latest(&mac_key(), Some(101), 8).unwrap().is_empty()).await;

    running.feed.send(vpc_mac(103, 20.0)).await.unwrap();
    let sink = running.sink.clone();
    eventually(move || sink.kinds().contains(&NotificationKind::Move)).await;

    let record = running
        .stores
        .history
        .read_anomaly(&mac_key(), AnomalyKind::Move, 0)
        .unwrap()
        .unwrap();
    assert_eq!(record.count, 1);
    match record.latest() {
        Some(AnomalyEvent::Move(delta)) => {
            assert_eq!(delta.src.node, vpc_node_id(101, 102));
            assert_eq!(delta.dst.node, vpc_node_id(103, 104));
        }
        other => panic!("unexpected anomaly {other:?}"),
    }
    stop(running).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_remote_is_confirmed_and_cleared() {
    let running = start().await;

    running.feed.send(remote_ip(103, "tunnel7", 10.0)).await.unwrap();
    let remediation = running.remediation.clone();
    eventually(move || !remediation.requests.lock().is_empty()).await;

    let record = running
        .stores
        .history
        .read_anomaly(&ip_key(), AnomalyKind::Stale, 103)
        .unwrap()
        .unwrap();
    assert_eq!(record.count, 1);
    let requests = running.remediation.requests.lock().clone();
    assert_eq!(requests[0].node, 103);
    assert_eq!(requests[0].addr, IP);
    assert_eq!(requests[0].vrf_or_vlan, "t1:v1");

    let sink = running.sink.clone();
    eventually(move || sink.kinds() == vec![NotificationKind::Stale, NotificationKind::Remediation]).await;
    stop(running).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fixed_remote_is_never_confirmed() {
    let running = start().await;

    running.feed.send(remote_ip(103, "tunnel7", 10.0)).await.unwrap();
    // the endpoint shows up behind the tunnel's far end before the window closes
    running.feed.send(local_ip(104, 10.5)).await.unwrap();
    running.feed.send(rewrite(104, 10.6)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(running
        .stores
        .history
        .read_anomaly(&ip_key(), AnomalyKind::Stale, 103)
        .unwrap()
        .is_none());
    assert!(running.remediation.requests.lock().is_empty());
    stop(running).await;
}
