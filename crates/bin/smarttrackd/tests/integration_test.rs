//! End-to-end tests for the full smarttrackd stack.
//!
//! Each test wires the real services (connection supervisor, telemetry
//! pipeline, tracker), in-memory `SQLite` storage and the axum router
//! around a scripted radio, then exercises the HTTP layer via
//! `tower::ServiceExt::oneshot`. No TCP port is bound.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tokio::sync::{mpsc, watch};
use tower::ServiceExt;

use smarttrack_adapter_http_axum::router;
use smarttrack_adapter_http_axum::state::AppState;
use smarttrack_adapter_storage_sqlite_sqlx::{Config, SqliteSessionArchive};
use smarttrack_app::event_bus::InProcessEventBus;
use smarttrack_app::ports::{
    AdapterEvents, CharacteristicInfo, DiscoveredPeripheral, RadioAdapter, ServiceInfo,
};
use smarttrack_app::services::connection_supervisor::{
    AdapterEventSink, ConnectionSupervisor, SupervisorConfig, SupervisorStatus,
    adapter_event_channel,
};
use smarttrack_app::services::device_registry::DeviceRegistry;
use smarttrack_app::telemetry::{TelemetryPipeline, WindowReader};
use smarttrack_app::tracker::Tracker;
use smarttrack_domain::adapter::AdapterState;
use smarttrack_domain::connection::{ConnectionState, FailureReason};
use smarttrack_domain::error::TrackerError;
use smarttrack_domain::id::DeviceId;

const DEVICE: &str = "A4:C1:38:5B:0E:DF";
const SERVICE: uuid::Uuid = uuid::Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e_24dc_ca9e);
const TX: uuid::Uuid = uuid::Uuid::from_u128(0x6e40_0003_b5a3_f393_e0a9_e50e_24dc_ca9e);
const WAIT: Duration = Duration::from_secs(5);

/// A peripheral that is always in range: scanning finds it, connecting
/// succeeds, and subscribing yields one reading.
struct ScriptedRadio {
    events: AdapterEventSink,
}

impl RadioAdapter for ScriptedRadio {
    async fn adapter_state(&self) -> AdapterState {
        AdapterState::PoweredOn
    }

    async fn start_scan(&self, target: Option<&DeviceId>) -> Result<(), TrackerError> {
        if let Some(id) = target {
            self.events.on_discovered(DiscoveredPeripheral {
                id: id.clone(),
                name: Some("SmartTrack".to_string()),
            });
        }
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn connect(&self, id: &DeviceId) -> Result<(), TrackerError> {
        self.events.on_connected(id.clone());
        Ok(())
    }

    async fn disconnect(&self, _id: &DeviceId) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn discover_services(&self, _id: &DeviceId) -> Result<Vec<ServiceInfo>, TrackerError> {
        Ok(vec![ServiceInfo { uuid: SERVICE }])
    }

    async fn discover_characteristics(
        &self,
        _id: &DeviceId,
        _service: &ServiceInfo,
    ) -> Result<Vec<CharacteristicInfo>, TrackerError> {
        Ok(vec![CharacteristicInfo {
            uuid: TX,
            service_uuid: SERVICE,
            supports_read: false,
            supports_notify: true,
        }])
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
        id: &DeviceId,
        characteristic: &CharacteristicInfo,
    ) -> Result<(), TrackerError> {
        self.events
            .on_value(id.clone(), characteristic.uuid, b"1.0,2.0,3.0".to_vec());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    sink: AdapterEventSink,
    status: watch::Receiver<SupervisorStatus>,
    window: WindowReader,
    last_raw: watch::Receiver<Option<String>>,
    archive: SqliteSessionArchive,
}

/// Build a fully-wired application backed by an in-memory `SQLite` database.
async fn app() -> TestApp {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise");
    let store = db.key_value_store();
    let archive = db.session_archive();

    let event_bus = Arc::new(InProcessEventBus::new(256));
    let tracker = Arc::new(Tracker::new(archive.clone(), Arc::clone(&event_bus)));

    let (telemetry_tx, telemetry_rx) = mpsc::channel(64);
    let pipeline = TelemetryPipeline::new(10, Arc::clone(&tracker), Arc::clone(&event_bus));
    let window = pipeline.window();
    let last_raw = pipeline.last_raw();
    pipeline.spawn(telemetry_rx);

    let (sink, inbox) = adapter_event_channel();
    let radio = ScriptedRadio {
        events: sink.clone(),
    };
    let (supervisor, _task) = ConnectionSupervisor::spawn(
        Arc::new(radio),
        DeviceRegistry::new(store.clone()),
        Arc::clone(&event_bus),
        inbox,
        telemetry_tx,
        SupervisorConfig::default(),
    );
    let status = supervisor.subscribe_status();

    let state = AppState::new(
        supervisor,
        tracker,
        DeviceRegistry::new(store),
        window.clone(),
        last_raw.clone(),
        event_bus,
    );

    TestApp {
        router: router::build(state),
        sink,
        status,
        window,
        last_raw,
        archive,
    }
}

impl TestApp {
    async fn call(&self, method: &str, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if !body.is_empty() {
            request = request.header("content-type", "application/json");
        }
        let resp = self
            .router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn connect(&self) -> serde_json::Value {
        let (status, body) = self
            .call(
                "POST",
                "/api/connect",
                &format!(r#"{{"device_id":"{DEVICE}"}}"#),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "connect failed: {body}");
        body
    }

    async fn wait_for_state(&self, state: ConnectionState) -> SupervisorStatus {
        let mut status = self.status.clone();
        tokio::time::timeout(WAIT, status.wait_for(|s| s.state == state))
            .await
            .expect("state reached in time")
            .unwrap()
            .clone()
    }

    async fn wait_for_raw(&self, raw: &str) {
        let mut last_raw = self.last_raw.clone();
        tokio::time::timeout(WAIT, last_raw.wait_for(|v| v.as_deref() == Some(raw)))
            .await
            .expect("payload processed in time")
            .unwrap();
    }

    fn device_id() -> DeviceId {
        DeviceId::new(DEVICE).unwrap()
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let app = app().await;

    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_connect_remember_and_stream_telemetry() {
    let app = app().await;

    let connected = app.connect().await;

    // the advertised name replaces the unknown one
    assert_eq!(connected["id"], DEVICE);
    assert_eq!(connected["display_name"], "SmartTrack");

    app.wait_for_raw("1.0,2.0,3.0").await;
    let window = app.window.snapshot();
    assert_eq!(window.len(), 3);
    assert!((window.as_slice()[1].value() - 2.0).abs() < f64::EPSILON);

    let (status, device) = app.call("GET", "/api/device", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(device["id"], DEVICE);
    assert_eq!(device["display_name"], "SmartTrack");

    let (_, supervisor) = app.call("GET", "/api/status", "").await;
    assert_eq!(supervisor["state"], "connected");
    assert_eq!(supervisor["target"]["id"], DEVICE);

    let (_, telemetry) = app.call("GET", "/api/telemetry", "").await;
    assert_eq!(telemetry["samples"].as_array().unwrap().len(), 3);
    assert_eq!(telemetry["last_raw"], "1.0,2.0,3.0");
}

#[tokio::test]
async fn should_reconnect_remembered_device_without_explicit_id() {
    let app = app().await;
    app.connect().await;
    app.call("POST", "/api/disconnect", "").await;
    app.wait_for_state(ConnectionState::Idle).await;

    let (status, body) = app.call("POST", "/api/connect", "{}").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], DEVICE);
}

#[tokio::test]
async fn should_fail_on_link_loss_and_recover_on_retry() {
    let app = app().await;
    app.connect().await;

    app.sink.on_disconnected(TestApp::device_id());
    let status = app.wait_for_state(ConnectionState::Failed).await;
    assert_eq!(status.failure, Some(FailureReason::LinkLost));

    let (status, body) = app.call("POST", "/api/retry", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], DEVICE);
    assert_eq!(app.status.borrow().state, ConnectionState::Connected);
}

#[tokio::test]
async fn should_forget_device_and_return_to_idle() {
    let app = app().await;
    app.connect().await;

    let (status, _) = app.call("POST", "/api/forget", "").await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.status.borrow().state, ConnectionState::Idle);
    let (status, _) = app.call("GET", "/api/device", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_ignore_values_from_other_peripherals() {
    let app = app().await;
    app.connect().await;
    app.wait_for_raw("1.0,2.0,3.0").await;

    app.sink.on_value(
        DeviceId::new("11:22:33:44:55:66").unwrap(),
        TX,
        b"9,9,9".to_vec(),
    );
    app.sink
        .on_value(TestApp::device_id(), TX, b"4,5,6".to_vec());
    app.wait_for_raw("4,5,6").await;

    let values: Vec<f64> = app.window.snapshot().iter().map(|s| s.value()).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_record_session_and_archive_it() {
    let app = app().await;
    app.connect().await;
    app.wait_for_raw("1.0,2.0,3.0").await;

    let (status, started) = app.call("POST", "/api/session/start", "").await;
    assert_eq!(status, StatusCode::OK);
    app.sink
        .on_value(TestApp::device_id(), TX, b"4,5,6".to_vec());
    app.wait_for_raw("4,5,6").await;
    app.sink
        .on_value(TestApp::device_id(), TX, b"not a triplet".to_vec());
    app.wait_for_raw("not a triplet").await;

    let (status, stopped) = app.call("POST", "/api/session/stop", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stopped["serialized_data"],
        r#"["4,5,6","not a triplet"]"#
    );

    let (status, saved) = app.call("POST", "/api/session/save", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["submitted"], true);
    assert_eq!(saved["session_id"], started["session_id"]);

    let archived = app.archive.recent(10).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].id.to_string(), started["session_id"]);
    assert_eq!(
        archived[0].serialized_data.as_deref(),
        Some(r#"["4,5,6","not a triplet"]"#)
    );
}

#[tokio::test]
async fn should_drop_empty_session_without_archiving() {
    let app = app().await;
    app.call("POST", "/api/session/start", "").await;
    app.call("POST", "/api/session/stop", "").await;

    let (status, saved) = app.call("POST", "/api/session/save", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["submitted"], false);
    assert!(app.archive.recent(10).await.unwrap().is_empty());
}
