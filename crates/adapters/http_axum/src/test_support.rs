//! Wiring of real services over in-memory ports for handler tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use axum::body::to_bytes;
use axum::response::Response;
use tokio::sync::mpsc;

use smarttrack_app::event_bus::InProcessEventBus;
use smarttrack_app::ports::{
    CharacteristicInfo, KeyValueStore, RadioAdapter, ServiceInfo, SessionBackend,
};
use smarttrack_app::services::connection_supervisor::{
    ConnectionSupervisor, SupervisorConfig, adapter_event_channel,
};
use smarttrack_app::services::device_registry::DeviceRegistry;
use smarttrack_app::telemetry::{RawPayload, TelemetryInput, TelemetryPipeline};
use smarttrack_app::tracker::Tracker;
use smarttrack_domain::adapter::AdapterState;
use smarttrack_domain::device::DeviceRef;
use smarttrack_domain::error::TrackerError;
use smarttrack_domain::id::DeviceId;
use smarttrack_domain::session::Session;

use crate::state::AppState;

#[derive(Clone, Default)]
pub struct MemoryStore(Arc<Mutex<HashMap<String, String>>>);

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, TrackerError>> + Send {
        let value = self.0.lock().unwrap().get(key).cloned();
        async move { Ok(value) }
    }

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.0
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        async { Ok(()) }
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.0.lock().unwrap().remove(key);
        async { Ok(()) }
    }
}

#[derive(Clone, Default)]
pub struct MemoryBackend(Arc<Mutex<Vec<Session>>>);

impl MemoryBackend {
    pub fn sessions(&self) -> Vec<Session> {
        self.0.lock().unwrap().clone()
    }
}

impl SessionBackend for MemoryBackend {
    fn add_session(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.0.lock().unwrap().push(session.clone());
        async { Ok(()) }
    }
}

/// Radio with a fixed adapter state that accepts every request and never
/// calls back.
pub struct StubRadio(AdapterState);

impl RadioAdapter for StubRadio {
    async fn adapter_state(&self) -> AdapterState {
        self.0
    }

    async fn start_scan(&self, _target: Option<&DeviceId>) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn connect(&self, _id: &DeviceId) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn disconnect(&self, _id: &DeviceId) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn discover_services(&self, _id: &DeviceId) -> Result<Vec<ServiceInfo>, TrackerError> {
        Ok(Vec::new())
    }

    async fn discover_characteristics(
        &self,
        _id: &DeviceId,
        _service: &ServiceInfo,
    ) -> Result<Vec<CharacteristicInfo>, TrackerError> {
        Ok(Vec::new())
    }

    async fn read(
        &self,
        _id: &DeviceId,
        _characteristic: &CharacteristicInfo,
    ) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn subscribe(
        &self,
        _id: &DeviceId,
        _characteristic: &CharacteristicInfo,
    ) -> Result<(), TrackerError> {
        Ok(())
    }
}

pub struct Fixture {
    pub state: AppState<MemoryStore, MemoryBackend>,
    pub backend: MemoryBackend,
    store: MemoryStore,
    telemetry: mpsc::Sender<TelemetryInput>,
}

impl Fixture {
    pub fn powered_on() -> Self {
        Self::with_adapter(AdapterState::PoweredOn)
    }

    pub fn with_adapter(adapter: AdapterState) -> Self {
        let store = MemoryStore::default();
        let backend = MemoryBackend::default();
        let bus = Arc::new(InProcessEventBus::new(64));
        let tracker = Arc::new(Tracker::new(backend.clone(), Arc::clone(&bus)));

        let (telemetry, inputs) = mpsc::channel(16);
        let pipeline = TelemetryPipeline::new(10, Arc::clone(&tracker), Arc::clone(&bus));
        let window = pipeline.window();
        let last_raw = pipeline.last_raw();
        pipeline.spawn(inputs);

        let (_sink, inbox) = adapter_event_channel();
        let (supervisor, _task) = ConnectionSupervisor::spawn(
            Arc::new(StubRadio(adapter)),
            DeviceRegistry::new(store.clone()),
            Arc::clone(&bus),
            inbox,
            telemetry.clone(),
            SupervisorConfig::default(),
        );

        let state = AppState::new(
            supervisor,
            tracker,
            DeviceRegistry::new(store.clone()),
            window,
            last_raw,
            bus,
        );
        Self {
            state,
            backend,
            store,
            telemetry,
        }
    }

    /// Let the spawned actors process what is queued.
    pub async fn settle(&self) {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    pub async fn remember(&self, id: &str, name: &str) {
        DeviceRegistry::new(self.store.clone())
            .remember(&DeviceRef::new(
                DeviceId::new(id).unwrap(),
                Some(name.to_owned()),
            ))
            .await
            .unwrap();
    }

    /// Push one payload through the pipeline and wait until it is applied.
    pub async fn feed(&self, raw: &str) {
        let mut last_raw = self.state.last_raw.clone();
        self.telemetry
            .send(TelemetryInput::Payload(RawPayload {
                device_id: DeviceId::new("AA").unwrap(),
                characteristic: uuid::Uuid::nil(),
                bytes: raw.as_bytes().to_vec(),
            }))
            .await
            .unwrap();
        last_raw
            .wait_for(|value| value.as_deref() == Some(raw))
            .await
            .unwrap();
    }
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
