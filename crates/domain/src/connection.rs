//! Connection state machine vocabulary.
//!
//! The transitions themselves are driven by the application layer's
//! supervisor; this module only names the states and the reasons an attempt
//! can fail.

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterState;

/// Lifecycle state of the single tracked connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    AwaitingAdapterReady,
    Scanning,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    /// Whether an attempt is in flight (neither idle nor terminal).
    #[must_use]
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            Self::AwaitingAdapterReady | Self::Scanning | Self::Connecting
        )
    }

    /// Whether the current attempt has reached an outcome.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Connected | Self::Failed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::AwaitingAdapterReady => f.write_str("awaiting_adapter_ready"),
            Self::Scanning => f.write_str("scanning"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Why an attempt ended in [`ConnectionState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// The adapter did not reach `PoweredOn` within the power-on timeout.
    AdapterNotReady { adapter: AdapterState },
    /// The target was not connected within the connection timeout.
    ConnectTimeout,
    /// An established link was dropped by the peer or the radio.
    LinkLost,
}

impl FailureReason {
    /// Human-readable explanation for the presentation layer.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::AdapterNotReady { adapter } => adapter.message(),
            Self::ConnectTimeout => "Couldn't connect to the device",
            Self::LinkLost => "Connection to the device was lost",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdapterNotReady { adapter } => write!(f, "adapter not ready ({adapter})"),
            Self::ConnectTimeout => f.write_str("connect timeout"),
            Self::LinkLost => f.write_str("link lost"),
        }
    }
}
