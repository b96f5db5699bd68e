//! In-memory test doubles for the ports.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use smarttrack_domain::adapter::AdapterState;
use smarttrack_domain::error::TrackerError;
use smarttrack_domain::id::DeviceId;
use smarttrack_domain::session::Session;

use crate::ports::{CharacteristicInfo, KeyValueStore, RadioAdapter, ServiceInfo, SessionBackend};
use crate::telemetry::ReadingSink;

// -- key-value store ---------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    pub fn is_empty(&self) -> bool {
        self.values.lock().unwrap().is_empty()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, TrackerError>> + Send {
        let result = self.values.lock().unwrap().get(key).cloned();
        async move { Ok(result) }
    }

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        async { Ok(()) }
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.values.lock().unwrap().remove(key);
        async { Ok(()) }
    }
}

// -- session backend ---------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingBackend {
    sessions: Arc<Mutex<Vec<Session>>>,
    fail: bool,
}

impl RecordingBackend {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().unwrap().clone()
    }
}

impl SessionBackend for RecordingBackend {
    fn add_session(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        let result = if self.fail {
            Err(TrackerError::Backend("backend unavailable".into()))
        } else {
            self.sessions.lock().unwrap().push(session.clone());
            Ok(())
        };
        async move { result }
    }
}

// -- reading sink ------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSink {
    readings: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn readings(&self) -> Vec<String> {
        self.readings.lock().unwrap().clone()
    }
}

impl ReadingSink for RecordingSink {
    fn record(&self, raw: &str) {
        self.readings.lock().unwrap().push(raw.to_owned());
    }
}

// -- radio -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    StartScan(Option<DeviceId>),
    StopScan,
    Connect(DeviceId),
    Disconnect(DeviceId),
    DiscoverServices(DeviceId),
    DiscoverCharacteristics(uuid::Uuid),
    Read(uuid::Uuid),
    Subscribe(uuid::Uuid),
}

/// Records every request; never calls back on its own. Tests drive the
/// callbacks through an adapter event sink.
#[derive(Default)]
pub struct FakeRadio {
    adapter: Mutex<AdapterState>,
    calls: Mutex<Vec<RadioCall>>,
    services: Mutex<Vec<ServiceInfo>>,
    characteristics: Mutex<Vec<CharacteristicInfo>>,
    fail_service_discovery: Mutex<bool>,
}

impl FakeRadio {
    pub fn with_adapter(state: AdapterState) -> Self {
        let radio = Self::default();
        radio.set_adapter_state(state);
        radio
    }

    pub fn set_adapter_state(&self, state: AdapterState) {
        *self.adapter.lock().unwrap() = state;
    }

    pub fn set_topology(&self, services: Vec<ServiceInfo>, characteristics: Vec<CharacteristicInfo>) {
        *self.services.lock().unwrap() = services;
        *self.characteristics.lock().unwrap() = characteristics;
    }

    pub fn fail_service_discovery(&self) {
        *self.fail_service_discovery.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<RadioCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RadioCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RadioAdapter for FakeRadio {
    fn adapter_state(&self) -> impl Future<Output = AdapterState> + Send {
        let state = *self.adapter.lock().unwrap();
        async move { state }
    }

    fn start_scan(
        &self,
        target: Option<&DeviceId>,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.record(RadioCall::StartScan(target.cloned()));
        async { Ok(()) }
    }

    fn stop_scan(&self) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.record(RadioCall::StopScan);
        async { Ok(()) }
    }

    fn connect(&self, id: &DeviceId) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.record(RadioCall::Connect(id.clone()));
        async { Ok(()) }
    }

    fn disconnect(&self, id: &DeviceId) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.record(RadioCall::Disconnect(id.clone()));
        async { Ok(()) }
    }

    fn discover_services(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<ServiceInfo>, TrackerError>> + Send {
        self.record(RadioCall::DiscoverServices(id.clone()));
        let result = if *self.fail_service_discovery.lock().unwrap() {
            Err(TrackerError::Radio("gatt unavailable".into()))
        } else {
            Ok(self.services.lock().unwrap().clone())
        };
        async move { result }
    }

    fn discover_characteristics(
        &self,
        _id: &DeviceId,
        service: &ServiceInfo,
    ) -> impl Future<Output = Result<Vec<CharacteristicInfo>, TrackerError>> + Send {
        self.record(RadioCall::DiscoverCharacteristics(service.uuid));
        let result = self
            .characteristics
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.service_uuid == service.uuid)
            .copied()
            .collect();
        async move { Ok(result) }
    }

    fn read(
        &self,
        _id: &DeviceId,
        characteristic: &CharacteristicInfo,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.record(RadioCall::Read(characteristic.uuid));
        async { Ok(()) }
    }

    fn subscribe(
        &self,
        _id: &DeviceId,
        characteristic: &CharacteristicInfo,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        self.record(RadioCall::Subscribe(characteristic.uuid));
        async { Ok(()) }
    }
}
