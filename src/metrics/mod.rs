use std::net::SocketAddr;
use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

#[cfg(test)]
mod metrics_test;

lazy_static! {
    pub static ref JOBS_DISPATCHED: IntCounterVec = IntCounterVec::new(
        Opts::new("ept_jobs_dispatched", "Jobs handed to workers"),
        &["fabric", "action"]
    )
    .expect("metric can not be created");

    pub static ref JOBS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("ept_jobs_rejected", "Jobs dropped by per-key backlog limits"),
        &["fabric"]
    )
    .expect("metric can not be created");

    pub static ref PARSE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("ept_parse_failures", "Transport records dropped as unparseable"),
        &["fabric", "class"]
    )
    .expect("metric can not be created");

    pub static ref ANOMALIES_CONFIRMED: IntCounterVec = IntCounterVec::new(
        Opts::new("ept_anomalies_confirmed", "Anomalies persisted after debounce"),
        &["fabric", "kind"]
    )
    .expect("metric can not be created");

    pub static ref REMEDIATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("ept_remediations", "Remediation attempts by outcome"),
        &["fabric", "outcome"]
    )
    .expect("metric can not be created");

    pub static ref WORKER_BACKLOG: IntGaugeVec = IntGaugeVec::new(
        Opts::new("ept_worker_backlog", "Outstanding jobs per worker"),
        &["fabric", "worker"]
    )
    .expect("metric can not be created");

    pub static ref TASK_RESTARTS: IntCounterVec = IntCounterVec::new(
        Opts::new("ept_task_restarts", "Fabric task restarts after fatal errors"),
        &["fabric"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

pub fn register_custom_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(JOBS_DISPATCHED.clone()),
            Box::new(JOBS_REJECTED.clone()),
            Box::new(PARSE_FAILURES.clone()),
            Box::new(ANOMALIES_CONFIRMED.clone()),
            Box::new(REMEDIATIONS.clone()),
            Box::new(WORKER_BACKLOG.clone()),
            Box::new(TASK_RESTARTS.clone()),
        ];
        for c in collectors {
            if let Err(e) = REGISTRY.register(c) {
                error!("collector can not be registered: {}", e);
            }
        }
    });
}

pub async fn start_server(
    addr: SocketAddr,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics();

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!("metrics server listening on {}", addr);
    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(addr, async move {
            let _ = shutdown_signal.changed().await;
        });
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(gather_text())
}

/// Text exposition of every registered collector.
pub fn gather_text() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
