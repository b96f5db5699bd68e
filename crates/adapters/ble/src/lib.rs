//! # smarttrack-adapter-ble
//!
//! BLE radio adapter: implements the [`RadioAdapter`] port on top of
//! `btleplug` and reports what the host adapter sees through an
//! [`AdapterEvents`] handler.
//!
//! ## How it works
//!
//! - A background task pumps `btleplug` central events: discoveries,
//!   disconnections and adapter power changes become callbacks.
//! - `connect` spawns one link task per peripheral. The task connects,
//!   reports the outcome, then forwards every GATT notification until the
//!   link is torn down.
//! - One-shot reads are awaited inline and their value is reported through
//!   the same `on_value` callback as notifications.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `smarttrack-app` and `smarttrack-domain`.

mod config;
mod error;
pub mod gatt;

pub use config::BleConfig;
pub use error::BleError;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use btleplug::api::{Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt as _};

use smarttrack_app::ports::{
    AdapterEvents, CharacteristicInfo, DiscoveredPeripheral, RadioAdapter, ServiceInfo,
};
use smarttrack_domain::adapter::AdapterState;
use smarttrack_domain::error::TrackerError;
use smarttrack_domain::id::DeviceId;

type PeripheralCache = Arc<Mutex<HashMap<DeviceId, Peripheral>>>;

/// [`RadioAdapter`] backed by the host Bluetooth adapter.
pub struct BtleplugRadio<E> {
    central: Adapter,
    events: Arc<E>,
    peripherals: PeripheralCache,
    links: Mutex<HashMap<DeviceId, JoinHandle<()>>>,
    pump: JoinHandle<()>,
}

impl<E: AdapterEvents + 'static> BtleplugRadio<E> {
    /// Open the configured host adapter and start reporting to `events`.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::NotAvailable`] when no adapter exists at
    /// `config.adapter_index`, or [`BleError::Btleplug`] when the adapter
    /// cannot be opened.
    pub async fn start(config: &BleConfig, events: E) -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        let central = manager
            .adapters()
            .await?
            .into_iter()
            .nth(config.adapter_index)
            .ok_or(BleError::NotAvailable)?;
        let stream = central.events().await?;

        let events = Arc::new(events);
        let peripherals = PeripheralCache::default();
        let pump = tokio::spawn(pump_central_events(
            central.clone(),
            stream,
            Arc::clone(&peripherals),
            Arc::clone(&events),
        ));

        tracing::info!(adapter_index = config.adapter_index, "BLE adapter started");
        Ok(Self {
            central,
            events,
            peripherals,
            links: Mutex::new(HashMap::new()),
            pump,
        })
    }

    async fn lookup(&self, id: &DeviceId) -> Result<Peripheral, BleError> {
        let cached = self
            .peripherals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned();
        if let Some(peripheral) = cached {
            return Ok(peripheral);
        }
        let peripheral = self
            .central
            .peripherals()
            .await?
            .into_iter()
            .find(|peripheral| peripheral.id().to_string() == id.as_str())
            .ok_or_else(|| BleError::UnknownPeripheral(id.to_string()))?;
        self.peripherals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), peripheral.clone());
        Ok(peripheral)
    }

    fn replace_link(&self, id: &DeviceId, task: Option<JoinHandle<()>>) {
        let mut links = self.links.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = match task {
            Some(task) => links.insert(id.clone(), task),
            None => links.remove(id),
        };
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn scan(&self, target: Option<&DeviceId>) -> Result<(), BleError> {
        self.central.start_scan(ScanFilter::default()).await?;
        tracing::debug!(device_id = ?target.map(DeviceId::as_str), "BLE scan started");
        // a peripheral seen before this scan will not be discovered again
        if let Some(target) = target {
            if let Ok(peripheral) = self.lookup(target).await {
                report_discovered(&peripheral, &self.peripherals, self.events.as_ref()).await;
            }
        }
        Ok(())
    }

    fn open_link(&self, id: &DeviceId, peripheral: Peripheral) {
        let task = tokio::spawn(run_link(
            peripheral,
            id.clone(),
            Arc::clone(&self.events),
        ));
        self.replace_link(id, Some(task));
    }

    async fn close_link(&self, id: &DeviceId) -> Result<(), BleError> {
        self.replace_link(id, None);
        let Ok(peripheral) = self.lookup(id).await else {
            return Ok(());
        };
        if peripheral.is_connected().await.unwrap_or(true) {
            peripheral.disconnect().await?;
            tracing::debug!(device_id = %id, "BLE peripheral disconnected");
        }
        Ok(())
    }

    async fn services(&self, id: &DeviceId) -> Result<Vec<ServiceInfo>, BleError> {
        let peripheral = self.lookup(id).await?;
        peripheral.discover_services().await?;
        Ok(peripheral.services().iter().map(gatt::service_info).collect())
    }

    async fn characteristics(
        &self,
        id: &DeviceId,
        service: &ServiceInfo,
    ) -> Result<Vec<CharacteristicInfo>, BleError> {
        let peripheral = self.lookup(id).await?;
        let found = peripheral
            .services()
            .into_iter()
            .find(|candidate| candidate.uuid == service.uuid)
            .ok_or(BleError::UnknownService(service.uuid))?;
        Ok(found
            .characteristics
            .iter()
            .map(gatt::characteristic_info)
            .collect())
    }

    async fn characteristic(
        &self,
        id: &DeviceId,
        info: &CharacteristicInfo,
    ) -> Result<(Peripheral, Characteristic), BleError> {
        let peripheral = self.lookup(id).await?;
        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|candidate| gatt::matches(candidate, info))
            .ok_or(BleError::UnknownCharacteristic(info.uuid))?;
        Ok((peripheral, characteristic))
    }

    async fn read_value(&self, id: &DeviceId, info: &CharacteristicInfo) -> Result<(), BleError> {
        let (peripheral, characteristic) = self.characteristic(id, info).await?;
        let value = peripheral.read(&characteristic).await?;
        self.events.on_value(id.clone(), characteristic.uuid, value);
        Ok(())
    }

    async fn enable_notifications(
        &self,
        id: &DeviceId,
        info: &CharacteristicInfo,
    ) -> Result<(), BleError> {
        let (peripheral, characteristic) = self.characteristic(id, info).await?;
        peripheral.subscribe(&characteristic).await?;
        tracing::debug!(device_id = %id, characteristic = %info.uuid, "notifications enabled");
        Ok(())
    }
}

impl<E: AdapterEvents + 'static> RadioAdapter for BtleplugRadio<E> {
    async fn adapter_state(&self) -> AdapterState {
        match self.central.adapter_state().await {
            Ok(state) => gatt::adapter_state(state),
            Err(err) => {
                tracing::warn!(%err, "failed to read BLE adapter state");
                AdapterState::Unknown
            }
        }
    }

    async fn start_scan(&self, target: Option<&DeviceId>) -> Result<(), TrackerError> {
        Ok(self.scan(target).await?)
    }

    async fn stop_scan(&self) -> Result<(), TrackerError> {
        self.central.stop_scan().await.map_err(BleError::from)?;
        tracing::debug!("BLE scan stopped");
        Ok(())
    }

    async fn connect(&self, id: &DeviceId) -> Result<(), TrackerError> {
        let peripheral = self.lookup(id).await?;
        self.open_link(id, peripheral);
        Ok(())
    }

    async fn disconnect(&self, id: &DeviceId) -> Result<(), TrackerError> {
        Ok(self.close_link(id).await?)
    }

    async fn discover_services(&self, id: &DeviceId) -> Result<Vec<ServiceInfo>, TrackerError> {
        Ok(self.services(id).await?)
    }

    async fn discover_characteristics(
        &self,
        id: &DeviceId,
        service: &ServiceInfo,
    ) -> Result<Vec<CharacteristicInfo>, TrackerError> {
        Ok(self.characteristics(id, service).await?)
    }

    async fn read(
        &self,
        id: &DeviceId,
        characteristic: &CharacteristicInfo,
    ) -> Result<(), TrackerError> {
        Ok(self.read_value(id, characteristic).await?)
    }

    async fn subscribe(
        &self,
        id: &DeviceId,
        characteristic: &CharacteristicInfo,
    ) -> Result<(), TrackerError> {
        Ok(self.enable_notifications(id, characteristic).await?)
    }
}

impl<E> Drop for BtleplugRadio<E> {
    fn drop(&mut self) {
        self.pump.abort();
        let links = self.links.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in links.drain() {
            task.abort();
        }
    }
}

fn device_id(peripheral: &Peripheral) -> Option<DeviceId> {
    DeviceId::new(peripheral.id().to_string()).ok()
}

async fn report_discovered<E: AdapterEvents>(
    peripheral: &Peripheral,
    cache: &PeripheralCache,
    events: &E,
) {
    let Some(id) = device_id(peripheral) else {
        return;
    };
    let name = match peripheral.properties().await {
        Ok(properties) => properties.and_then(|props| props.local_name),
        Err(err) => {
            tracing::debug!(%err, device_id = %id, "failed to read peripheral properties");
            None
        }
    };
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id.clone(), peripheral.clone());
    tracing::trace!(device_id = %id, ?name, "BLE device detected");
    events.on_discovered(DiscoveredPeripheral { id, name });
}

async fn pump_central_events<E: AdapterEvents>(
    central: Adapter,
    mut stream: impl Stream<Item = CentralEvent> + Unpin,
    cache: PeripheralCache,
    events: Arc<E>,
) {
    while let Some(event) = stream.next().await {
        match event {
            CentralEvent::DeviceDiscovered(id) => {
                if let Ok(peripheral) = central.peripheral(&id).await {
                    report_discovered(&peripheral, &cache, events.as_ref()).await;
                }
            }
            CentralEvent::DeviceDisconnected(id) => {
                if let Ok(id) = DeviceId::new(id.to_string()) {
                    events.on_disconnected(id);
                }
            }
            CentralEvent::StateUpdate(state) => {
                events.on_adapter_state(gatt::adapter_state(state));
            }
            _ => {}
        }
    }
    tracing::debug!("BLE event stream ended");
}

/// Connect, report the outcome, then forward notifications until aborted.
async fn run_link<E: AdapterEvents>(peripheral: Peripheral, id: DeviceId, events: Arc<E>) {
    if let Err(err) = peripheral.connect().await {
        events.on_connect_failed(id, BleError::from(err).into());
        return;
    }
    // subscribe to the stream before reporting, so no early value is lost
    let notifications = match peripheral.notifications().await {
        Ok(stream) => Some(stream),
        Err(err) => {
            tracing::warn!(%err, device_id = %id, "failed to open notification stream");
            None
        }
    };
    events.on_connected(id.clone());

    let Some(mut notifications) = notifications else {
        return;
    };
    while let Some(notification) = notifications.next().await {
        events.on_value(id.clone(), notification.uuid, notification.value);
    }
    tracing::debug!(device_id = %id, "notification stream ended");
}
