//! Telemetry samples: one axis value of a sensor triplet.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Axis a sample belongs to. A triplet always carries X, Y, Z in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// The three axes in payload order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => f.write_str("X"),
            Self::Y => f.write_str("Y"),
            Self::Z => f.write_str("Z"),
        }
    }
}

/// A single decoded value. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    axis: Axis,
    value: f64,
    received_at: Timestamp,
}

impl TelemetrySample {
    #[must_use]
    pub fn new(axis: Axis, value: f64, received_at: Timestamp) -> Self {
        Self {
            axis,
            value,
            received_at,
        }
    }

    #[must_use]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn received_at(&self) -> Timestamp {
        self.received_at
    }
}
