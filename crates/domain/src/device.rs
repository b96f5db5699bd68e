//! Device reference: the identity and cosmetic name of a remote sensor.

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

/// Display name used when a peripheral does not advertise one.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A remote sensor as known to the client.
///
/// Identity is the [`DeviceId`]; `display_name` is cosmetic and two
/// references with the same id but different names denote the same device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRef {
    pub id: DeviceId,
    pub display_name: String,
}

impl DeviceRef {
    /// Build a reference, falling back to [`UNKNOWN_NAME`] when the
    /// advertised name is missing or blank.
    #[must_use]
    pub fn new(id: DeviceId, display_name: Option<String>) -> Self {
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_owned());
        Self { id, display_name }
    }

    /// Whether the peripheral advertised a usable name.
    #[must_use]
    pub fn has_name(&self) -> bool {
        self.display_name != UNKNOWN_NAME
    }

    /// Label for UI messages: the name when known, the identifier otherwise.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.has_name() {
            &self.display_name
        } else {
            self.id.as_str()
        }
    }
}

impl PartialEq for DeviceRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DeviceRef {}
