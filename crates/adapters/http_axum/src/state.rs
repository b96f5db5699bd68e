//! Shared application state for axum handlers.

use std::sync::Arc;

use tokio::sync::watch;

use smarttrack_app::event_bus::InProcessEventBus;
use smarttrack_app::services::connection_supervisor::SupervisorHandle;
use smarttrack_app::services::device_registry::DeviceRegistry;
use smarttrack_app::telemetry::WindowReader;
use smarttrack_app::tracker::Tracker;

/// The tracker as wired by the daemon: session events go to the bus.
pub type SharedTracker<B> = Arc<Tracker<B, Arc<InProcessEventBus>>>;

/// Application state shared across all axum handlers.
///
/// Generic over the key-value store behind the device registry and the
/// session backend, to avoid dynamic dispatch. `Clone` is implemented
/// manually so the underlying types themselves do not need to be `Clone`.
pub struct AppState<S, B> {
    /// Client of the connection supervisor actor.
    pub supervisor: SupervisorHandle,
    /// Session lifecycle and reading log.
    pub tracker: SharedTracker<B>,
    /// Read access to the remembered device.
    pub registry: Arc<DeviceRegistry<S>>,
    /// Latest published telemetry window.
    pub window: WindowReader,
    /// Latest raw payload text.
    pub last_raw: watch::Receiver<Option<String>>,
    /// Event bus for the SSE stream.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<S, B> Clone for AppState<S, B> {
    fn clone(&self) -> Self {
        Self {
            supervisor: self.supervisor.clone(),
            tracker: Arc::clone(&self.tracker),
            registry: Arc::clone(&self.registry),
            window: self.window.clone(),
            last_raw: self.last_raw.clone(),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<S, B> AppState<S, B> {
    /// Create the state from already running services.
    pub fn new(
        supervisor: SupervisorHandle,
        tracker: SharedTracker<B>,
        registry: DeviceRegistry<S>,
        window: WindowReader,
        last_raw: watch::Receiver<Option<String>>,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        Self {
            supervisor,
            tracker,
            registry: Arc::new(registry),
            window,
            last_raw,
            event_bus,
        }
    }
}
