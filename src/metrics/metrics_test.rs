use super::*;

#[test]
fn test_registered_collectors_are_exported() {
    register_custom_metrics();
    // registering twice must be harmless
    register_custom_metrics();

    ANOMALIES_CONFIRMED.with_label_values(&["metrics-test", "stale"]).inc();
    WORKER_BACKLOG.with_label_values(&["metrics-test", "0"]).set(3);

    let body = gather_text();
    assert!(body.contains("ept_anomalies_confirmed"));
    assert!(body.contains("ept_worker_backlog"));
}
