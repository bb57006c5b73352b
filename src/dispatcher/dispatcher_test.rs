use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::test_utils::*;
use crate::EndpointKey;
use crate::Error;
use crate::HelloReply;
use crate::Job;
use crate::JobAction;
use crate::JobDone;
use crate::LivenessError;
use crate::NotificationSink;
use crate::PriorityMessage;
use crate::Result;
use crate::Settings;
use crate::Stores;
use crate::WatchMessage;
use crate::WorkerMessage;

struct Harness {
    job_tx: mpsc::Sender<Job>,
    #[allow(dead_code)]
    done_tx: mpsc::UnboundedSender<JobDone>,
    hello_tx: mpsc::UnboundedSender<HelloReply>,
    workers: Vec<mpsc::UnboundedReceiver<WorkerMessage>>,
    priority: mpsc::UnboundedReceiver<PriorityMessage>,
    watch: mpsc::UnboundedReceiver<WatchMessage>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

fn start(settings: Settings) -> Harness {
    let stores = Stores::in_memory();
    let sink: std::sync::Arc<dyn NotificationSink> = std::sync::Arc::new(RecordingSink::new());
    let workers_n = settings.dispatcher.workers;
    let ctx = test_context(settings, &stores, sink);

    let (job_tx, jobs) = mpsc::channel(64);
    let (done_tx, done) = mpsc::unbounded_channel();
    let (hello_tx, hello) = mpsc::unbounded_channel();
    let mut senders = Vec::new();
    let mut workers = Vec::new();
    for _ in 0..workers_n {
        let (tx, rx) = mpsc::unbounded_channel();
        senders.push(tx);
        workers.push(rx);
    }
    let (priority_tx, priority) = mpsc::unbounded_channel();
    let (watch_tx, watch) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(
        ctx,
        DispatcherInbox { jobs, done, hello },
        DispatcherOutputs {
            workers: senders,
            priority: priority_tx,
            watch: watch_tx,
        },
        cancel.clone(),
    );
    Harness {
        job_tx,
        done_tx,
        hello_tx,
        workers,
        priority,
        watch,
        cancel,
        handle: tokio::spawn(dispatcher.run()),
    }
}

fn settings(workers: usize) -> Settings {
    let mut s = Settings::default();
    s.dispatcher.workers = workers;
    s
}

fn key(n: u32) -> EndpointKey {
    EndpointKey::ip(FABRIC, &format!("10.0.0.{n}"), VRF)
}

/// Next job on `rx`, skipping hellos.
async fn next_job(rx: &mut mpsc::UnboundedReceiver<WorkerMessage>) -> Job {
    loop {
        match rx.recv().await {
            Some(WorkerMessage::Job(job)) => return job,
            Some(_) => continue,
            None => panic!("worker queue closed"),
        }
    }
}

#[tokio::test]
async fn test_jobs_for_one_key_reach_one_worker() {
    let mut h = start(settings(2));
    h.job_tx.send(Job::refresh(key(1), 1.0)).await.unwrap();
    h.job_tx.send(Job::refresh(key(2), 2.0)).await.unwrap();
    h.job_tx.send(Job::delete_endpoint(key(1), 3.0)).await.unwrap();

    let first = next_job(&mut h.workers[0]).await;
    let second = next_job(&mut h.workers[0]).await;
    assert_eq!((first.key.clone(), first.ts), (key(1), 1.0));
    assert_eq!(second.action, JobAction::DeleteEndpoint);
    assert_ne!(first.session, 0);
    assert_eq!(first.session, second.session);
    assert_eq!(next_job(&mut h.workers[1]).await.key, key(2));

    h.cancel.cancel();
    h.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_repeated_overflow_sends_key_failure() {
    let mut s = settings(2);
    s.dispatcher.max_key_count = 1;
    s.dispatcher.key_failure_threshold = 2;
    let mut h = start(s);
    for ts in 1..=3 {
        h.job_tx.send(Job::refresh(key(1), ts as f64)).await.unwrap();
    }

    assert_eq!(next_job(&mut h.workers[0]).await.action, JobAction::Refresh);
    assert_eq!(
        next_job(&mut h.workers[0]).await.action,
        JobAction::KeyFailure { attempts: 2 }
    );
    h.cancel.cancel();
}

#[tokio::test]
async fn test_global_backlog_stops_dispatcher() {
    let mut s = settings(1);
    s.dispatcher.max_jobs = 2;
    let h = start(s);
    for n in 1..=3 {
        h.job_tx.send(Job::refresh(key(n), 1.0)).await.unwrap();
    }
    let err = h.handle.await.unwrap().unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test(start_paused = true)]
async fn test_missing_hello_reply_is_fatal() {
    let h = start(settings(1));
    let err = h.handle.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Liveness(LivenessError::Timeout { .. })));
    // receivers stay open until the timeout fires
    drop(h.workers);
    drop(h.priority);
    drop(h.watch);
}

#[tokio::test(start_paused = true)]
async fn test_echoed_hellos_keep_pool_alive() {
    let mut h = start(settings(1));
    let hello_tx = h.hello_tx.clone();
    let mut worker = h.workers.remove(0);
    let mut priority = h.priority;
    let mut watch = h.watch;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(WorkerMessage::Hello(hello)) = worker.recv() => {
                    let _ = hello_tx.send(HelloReply { entity: crate::Entity::Worker(0), seq: hello.seq });
                }
                Some(PriorityMessage::Hello(hello)) = priority.recv() => {
                    let _ = hello_tx.send(HelloReply { entity: crate::Entity::Priority, seq: hello.seq });
                }
                Some(WatchMessage::Hello(hello)) = watch.recv() => {
                    let _ = hello_tx.send(HelloReply { entity: crate::Entity::Watcher, seq: hello.seq });
                }
                else => break,
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!h.handle.is_finished());
    h.cancel.cancel();
    h.handle.await.unwrap().unwrap();
}
