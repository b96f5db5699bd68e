//! Adapter state: power/authorisation status of the local radio.

use serde::{Deserialize, Serialize};

/// Status of the local radio adapter. Scanning and connecting are only
/// permitted in [`PoweredOn`](Self::PoweredOn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    #[default]
    Unknown,
    Unsupported,
    Unauthorized,
    Resetting,
    PoweredOff,
    PoweredOn,
}

impl AdapterState {
    /// Whether scanning and connecting are allowed.
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::PoweredOn)
    }

    /// Human-readable status shown to the user.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown error, Bluetooth usage not possible, restart your device",
            Self::Unsupported => "Bluetooth is not supported on your device",
            Self::Unauthorized => "Please allow this app to use your device Bluetooth",
            Self::Resetting => "Bluetooth is resetting... Please wait",
            Self::PoweredOff => "Please turn ON your Bluetooth",
            Self::PoweredOn => "Bluetooth ON and ready",
        }
    }
}

impl std::fmt::Display for AdapterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Unsupported => f.write_str("unsupported"),
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::Resetting => f.write_str("resetting"),
            Self::PoweredOff => f.write_str("powered_off"),
            Self::PoweredOn => f.write_str("powered_on"),
        }
    }
}
