//! Event: an immutable record of something that happened.
//!
//! Events are produced by the connection supervisor, the telemetry pipeline
//! and the session recorder, and fanned out to UI consumers.

use serde::{Deserialize, Serialize};

use crate::connection::{ConnectionState, FailureReason};
use crate::device::DeviceRef;
use crate::id::{DeviceId, SessionId};
use crate::time::{self, Timestamp};

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    ScanStarted {
        target: Option<DeviceId>,
    },
    DeviceDiscovered {
        device: DeviceRef,
    },
    Connected {
        device: DeviceRef,
    },
    Failed {
        reason: FailureReason,
        message: String,
    },
    /// Service/characteristic discovery failed or found nothing to stream;
    /// the link stays up.
    DiscoveryIncomplete {
        device_id: DeviceId,
        detail: String,
    },
    DeviceForgotten,
    TelemetryReceived {
        raw: String,
        samples: usize,
    },
    SessionStarted {
        session_id: SessionId,
    },
    SessionStopped {
        session_id: SessionId,
        readings: usize,
    },
    SessionSaved {
        session_id: SessionId,
    },
    SessionSaveFailed {
        session_id: SessionId,
    },
}

/// A timestamped [`EventKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Stamp `kind` with the current time.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: time::now(),
            kind,
        }
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}
