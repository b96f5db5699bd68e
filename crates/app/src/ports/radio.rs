//! Radio port: the central-role capabilities of the local adapter.
//!
//! The radio is split in two halves:
//!
//! - [`RadioAdapter`]: requests the core issues (scan, connect, discover,
//!   read, subscribe). Requests return once *issued*; their outcome arrives
//!   later as a callback.
//! - [`AdapterEvents`]: the callbacks the radio delivers from its own
//!   context: adapter power changes, discoveries, link up/down, and
//!   characteristic values (both one-shot reads and notifications).
//!
//! The connection supervisor registers itself as the sole
//! [`AdapterEvents`] handler.

use std::future::Future;

use smarttrack_domain::adapter::AdapterState;
use smarttrack_domain::device::DeviceRef;
use smarttrack_domain::error::TrackerError;
use smarttrack_domain::id::DeviceId;

/// A peripheral seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeripheral {
    pub id: DeviceId,
    pub name: Option<String>,
}

impl DiscoveredPeripheral {
    /// Convert into a [`DeviceRef`], defaulting the name to `"Unknown"`.
    #[must_use]
    pub fn into_device_ref(self) -> DeviceRef {
        DeviceRef::new(self.id, self.name)
    }
}

/// A remote GATT service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceInfo {
    pub uuid: uuid::Uuid,
}

/// A remote GATT characteristic and the capabilities the core cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicInfo {
    pub uuid: uuid::Uuid,
    pub service_uuid: uuid::Uuid,
    pub supports_read: bool,
    pub supports_notify: bool,
}

/// Callbacks delivered by the radio.
///
/// Methods are synchronous and must not block: implementations queue the
/// event and return.
pub trait AdapterEvents: Send + Sync {
    /// The adapter power/authorisation state changed.
    fn on_adapter_state(&self, state: AdapterState);

    /// A peripheral was seen while scanning.
    fn on_discovered(&self, peripheral: DiscoveredPeripheral);

    /// A connect request completed successfully.
    fn on_connected(&self, id: DeviceId);

    /// A connect request failed.
    fn on_connect_failed(&self, id: DeviceId, error: TrackerError);

    /// A link went down (requested or not).
    fn on_disconnected(&self, id: DeviceId);

    /// A characteristic value arrived, from a read or a notification.
    fn on_value(&self, id: DeviceId, characteristic: uuid::Uuid, value: Vec<u8>);
}

/// Requests the core issues to the radio.
pub trait RadioAdapter {
    /// Current adapter state.
    fn adapter_state(&self) -> impl Future<Output = AdapterState> + Send;

    /// Start scanning. When `target` is set, only that peripheral matters
    /// to the caller; adapters may still report others.
    fn start_scan(
        &self,
        target: Option<&DeviceId>,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send;

    /// Stop any scan in progress.
    fn stop_scan(&self) -> impl Future<Output = Result<(), TrackerError>> + Send;

    /// Issue a connect request. The outcome is reported through
    /// [`AdapterEvents::on_connected`] / [`AdapterEvents::on_connect_failed`].
    fn connect(&self, id: &DeviceId) -> impl Future<Output = Result<(), TrackerError>> + Send;

    /// Tear down the link to `id`, or cancel a pending connect to it.
    fn disconnect(&self, id: &DeviceId) -> impl Future<Output = Result<(), TrackerError>> + Send;

    /// Discover the services of a connected peripheral.
    fn discover_services(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<ServiceInfo>, TrackerError>> + Send;

    /// Discover the characteristics of one service.
    fn discover_characteristics(
        &self,
        id: &DeviceId,
        service: &ServiceInfo,
    ) -> impl Future<Output = Result<Vec<CharacteristicInfo>, TrackerError>> + Send;

    /// Issue one read. The value arrives through [`AdapterEvents::on_value`].
    fn read(
        &self,
        id: &DeviceId,
        characteristic: &CharacteristicInfo,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send;

    /// Enable notifications. Values arrive through [`AdapterEvents::on_value`].
    fn subscribe(
        &self,
        id: &DeviceId,
        characteristic: &CharacteristicInfo,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send;
}

impl<T: RadioAdapter + Send + Sync> RadioAdapter for std::sync::Arc<T> {
    fn adapter_state(&self) -> impl Future<Output = AdapterState> + Send {
        (**self).adapter_state()
    }

    fn start_scan(
        &self,
        target: Option<&DeviceId>,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        (**self).start_scan(target)
    }

    fn stop_scan(&self) -> impl Future<Output = Result<(), TrackerError>> + Send {
        (**self).stop_scan()
    }

    fn connect(&self, id: &DeviceId) -> impl Future<Output = Result<(), TrackerError>> + Send {
        (**self).connect(id)
    }

    fn disconnect(&self, id: &DeviceId) -> impl Future<Output = Result<(), TrackerError>> + Send {
        (**self).disconnect(id)
    }

    fn discover_services(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<ServiceInfo>, TrackerError>> + Send {
        (**self).discover_services(id)
    }

    fn discover_characteristics(
        &self,
        id: &DeviceId,
        service: &ServiceInfo,
    ) -> impl Future<Output = Result<Vec<CharacteristicInfo>, TrackerError>> + Send {
        (**self).discover_characteristics(id, service)
    }

    fn read(
        &self,
        id: &DeviceId,
        characteristic: &CharacteristicInfo,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        (**self).read(id, characteristic)
    }

    fn subscribe(
        &self,
        id: &DeviceId,
        characteristic: &CharacteristicInfo,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        (**self).subscribe(id, characteristic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_missing_name_when_converting_to_device_ref() {
        let peripheral = DiscoveredPeripheral {
            id: DeviceId::new("AA:BB").unwrap(),
            name: None,
        };
        let device = peripheral.into_device_ref();
        assert_eq!(device.display_name, "Unknown");
        assert_eq!(device.id.as_str(), "AA:BB");
    }
}
