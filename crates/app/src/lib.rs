//! # smarttrack-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RadioAdapter`: scan, connect, GATT discovery, read/notify
//!   - `AdapterEvents`: callbacks the radio delivers (discovery, link, values)
//!   - `KeyValueStore`: tiny durable string store
//!   - `SessionBackend`: where finished sessions are submitted
//!   - `EventPublisher`: fan-out of domain events
//! - Provide the **services** driving the system:
//!   - `DeviceRegistry`: remember / recall / forget the bonded device
//!   - `Scanner`: filter and de-duplicate discoveries
//!   - `ConnectionSupervisor`: the connection state machine (actor)
//!   - `CharacteristicSubscriber`: GATT discovery and notify activation
//!   - `SessionRecorder`: tracking-session lifecycle
//! - Provide the **telemetry pipeline** (ingest → window → record)
//! - Provide the UI-facing [`tracker::Tracker`] that owns the session and
//!   the window snapshot
//!
//! ## Dependency rule
//! Depends on `smarttrack-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod ports;
pub mod services;
pub mod telemetry;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;
