//! Device registry: remembers the last bonded device.

use smarttrack_domain::device::DeviceRef;
use smarttrack_domain::error::TrackerError;
use smarttrack_domain::id::DeviceId;

use crate::ports::KeyValueStore;

/// Store key holding the remembered device identifier.
pub const LAST_DEVICE_ID_KEY: &str = "last_connected_device_id";
/// Store key holding the remembered device display name.
pub const LAST_DEVICE_NAME_KEY: &str = "last_connected_device_name";

/// Persists at most one [`DeviceRef`] in a [`KeyValueStore`].
#[derive(Clone)]
pub struct DeviceRegistry<S> {
    store: S,
}

impl<S: KeyValueStore> DeviceRegistry<S> {
    /// Create a registry backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist `device`, replacing any previously remembered one.
    ///
    /// # Errors
    ///
    /// Returns the store error if a write fails.
    #[tracing::instrument(skip(self, device), fields(device_id = %device.id))]
    pub async fn remember(&self, device: &DeviceRef) -> Result<(), TrackerError> {
        self.store
            .set(LAST_DEVICE_ID_KEY, device.id.as_str())
            .await?;
        self.store
            .set(LAST_DEVICE_NAME_KEY, &device.display_name)
            .await?;
        tracing::debug!("device remembered");
        Ok(())
    }

    /// Return the remembered device, if any.
    ///
    /// A stored identifier without a name recalls as `"Unknown"`. A stored
    /// identifier that is not a valid [`DeviceId`] is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns the store error if a read fails.
    pub async fn recall(&self) -> Result<Option<DeviceRef>, TrackerError> {
        let Some(raw_id) = self.store.get(LAST_DEVICE_ID_KEY).await? else {
            return Ok(None);
        };
        let Ok(id) = DeviceId::new(raw_id) else {
            tracing::warn!("ignoring invalid remembered device identifier");
            return Ok(None);
        };
        let name = self.store.get(LAST_DEVICE_NAME_KEY).await?;
        Ok(Some(DeviceRef::new(id, name)))
    }

    /// Clear the remembered device.
    ///
    /// # Errors
    ///
    /// Returns the store error if a removal fails.
    #[tracing::instrument(skip(self))]
    pub async fn forget(&self) -> Result<(), TrackerError> {
        self.store.remove(LAST_DEVICE_ID_KEY).await?;
        self.store.remove(LAST_DEVICE_NAME_KEY).await?;
        tracing::debug!("device forgotten");
        Ok(())
    }
}
