//! # smarttrackd: smarttrack daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and initialise tracing
//! - Initialize the `SQLite` connection pool and run migrations
//! - Open the host Bluetooth adapter
//! - Spawn the connection supervisor and the telemetry pipeline
//! - Reconnect to the remembered device when configured to
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{Notify, mpsc};
use tracing_subscriber::EnvFilter;

use smarttrack_adapter_ble::BtleplugRadio;
use smarttrack_adapter_http_axum::router;
use smarttrack_adapter_http_axum::state::AppState;
use smarttrack_adapter_storage_sqlite_sqlx as storage;
use smarttrack_app::event_bus::InProcessEventBus;
use smarttrack_app::ports::KeyValueStore;
use smarttrack_app::services::connection_supervisor::{
    ConnectionSupervisor, SupervisorHandle, adapter_event_channel,
};
use smarttrack_app::services::device_registry::DeviceRegistry;
use smarttrack_app::telemetry::TelemetryPipeline;
use smarttrack_app::tracker::Tracker;

use crate::config::Config;

const EVENT_BUS_CAPACITY: usize = 256;
const TELEMETRY_BUFFER: usize = 64;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Storage
    let db = storage::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("failed to open database")?;
    let store = db.key_value_store();

    // Event bus and session tracking
    let event_bus = Arc::new(InProcessEventBus::new(EVENT_BUS_CAPACITY));
    let tracker = Arc::new(Tracker::new(db.session_archive(), Arc::clone(&event_bus)));

    // Telemetry
    let (telemetry_tx, telemetry_rx) = mpsc::channel(TELEMETRY_BUFFER);
    let pipeline = TelemetryPipeline::new(
        config.telemetry.max_history,
        Arc::clone(&tracker),
        Arc::clone(&event_bus),
    );
    let window = pipeline.window();
    let last_raw = pipeline.last_raw();
    let pipeline_task = pipeline.spawn(telemetry_rx);

    // Radio and connection supervisor
    let (sink, inbox) = adapter_event_channel();
    let radio = BtleplugRadio::start(&config.ble, sink)
        .await
        .context("failed to open the Bluetooth adapter")?;
    let (supervisor, supervisor_task) = ConnectionSupervisor::spawn(
        Arc::new(radio),
        DeviceRegistry::new(store.clone()),
        Arc::clone(&event_bus),
        inbox,
        telemetry_tx,
        config.ble.supervisor_config(),
    );

    if config.ble.auto_connect {
        tokio::spawn(reconnect_remembered(
            supervisor.clone(),
            DeviceRegistry::new(store.clone()),
        ));
    }

    // HTTP
    let state = AppState::new(
        supervisor,
        tracker,
        DeviceRegistry::new(store),
        window,
        last_raw,
        event_bus,
    );
    let app = router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "smarttrackd listening");

    // event streams never end on their own, so bound the graceful phase
    let signalled = Arc::new(Notify::new());
    let server = axum::serve(listener, app).with_graceful_shutdown({
        let signalled = Arc::clone(&signalled);
        async move {
            shutdown_signal().await;
            signalled.notify_one();
        }
    });
    tokio::select! {
        result = server.into_future() => result.context("server error")?,
        () = async {
            signalled.notified().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } => tracing::warn!("open connections did not close in time"),
    }

    // the router owned the last handles; the supervisor tears down the
    // link, then the pipeline drains
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = supervisor_task.await;
        let _ = pipeline_task.await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!("background tasks did not stop in time");
    }
    tracing::info!("smarttrackd stopped");
    Ok(())
}

/// Start an attempt against the remembered device, if there is one.
async fn reconnect_remembered<S: KeyValueStore + Send + Sync>(
    supervisor: SupervisorHandle,
    registry: DeviceRegistry<S>,
) {
    let device = match registry.recall().await {
        Ok(Some(device)) => device,
        Ok(None) => {
            tracing::debug!("no remembered device");
            return;
        }
        Err(err) => {
            tracing::warn!(%err, "failed to recall remembered device");
            return;
        }
    };
    tracing::info!(device_id = %device.id, name = %device.display_name, "reconnecting to remembered device");
    match supervisor.connect(device).await {
        Ok(device) => tracing::info!(device_id = %device.id, "reconnected"),
        Err(err) => tracing::warn!(%err, "reconnect failed"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
