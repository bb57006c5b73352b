use std::path::Path;
use std::sync::Arc;

use ept_engine::start_server;
use ept_engine::Error;
use ept_engine::FabricTask;
use ept_engine::LogNotificationSink;
use ept_engine::LogRemediation;
use ept_engine::ReplayTransport;
use ept_engine::Result;
use ept_engine::Settings;
use ept_engine::StorageError;
use ept_engine::Stores;
use ept_engine::SystemError;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<()> {
    let settings = Settings::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.fabric.name, &settings.fabric.log_dir)?;

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    let stores = Stores::open(&settings.storage)?;
    if settings.monitoring.prometheus_enabled {
        let addr = settings.monitoring.metrics_addr();
        let shutdown = graceful_rx.clone();
        tokio::spawn(async move {
            start_server(addr, shutdown).await;
        });
    }

    let replay_path = settings
        .transport
        .replay_path
        .clone()
        .ok_or_else(|| Error::Fatal("transport.replay_path is required".to_string()))?;
    let transport = ReplayTransport::open(&replay_path, &settings.fabric.name, settings.fabric.overlay_vnid).await?;

    let task = FabricTask::new(
        settings,
        stores,
        Arc::new(transport),
        Arc::new(LogRemediation),
        Arc::new(LogNotificationSink),
        graceful_rx,
    );

    info!("Application started. Waiting for CTRL+C signal...");
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    if let Err(e) = task.run().await {
        error!("fabric task stops: {:?}", e);
    }

    info!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| SystemError::SignalSendFailed(e.to_string()))?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| SystemError::SignalSendFailed(e.to_string()))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        SystemError::SignalSendFailed(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown completed");
    Ok(())
}

/// Installs the global subscriber writing to `<log_dir>/<fabric>/ept.log`.
pub fn init_observability(
    fabric: &str,
    log_dir: &Path,
) -> Result<WorkerGuard> {
    let dir = log_dir.join(fabric);
    std::fs::create_dir_all(&dir).map_err(StorageError::IoError)?;
    let log_file = tracing_appender::rolling::never(dir, "ept.log");

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
