//! Mapping between btleplug GATT/adapter types and the radio port types.

use btleplug::api::{CentralState, CharPropFlags, Characteristic, Service};

use smarttrack_app::ports::{CharacteristicInfo, ServiceInfo};
use smarttrack_domain::adapter::AdapterState;

/// Translate the host adapter power state.
///
/// btleplug only distinguishes on, off and unknown.
#[must_use]
pub fn adapter_state(state: CentralState) -> AdapterState {
    match state {
        CentralState::PoweredOn => AdapterState::PoweredOn,
        CentralState::PoweredOff => AdapterState::PoweredOff,
        CentralState::Unknown => AdapterState::Unknown,
    }
}

#[must_use]
pub fn service_info(service: &Service) -> ServiceInfo {
    ServiceInfo { uuid: service.uuid }
}

/// Capabilities relevant to telemetry. Indications count as notifications.
#[must_use]
pub fn characteristic_info(characteristic: &Characteristic) -> CharacteristicInfo {
    characteristic_info_from(
        characteristic.uuid,
        characteristic.service_uuid,
        characteristic.properties,
    )
}

fn characteristic_info_from(
    uuid: uuid::Uuid,
    service_uuid: uuid::Uuid,
    properties: CharPropFlags,
) -> CharacteristicInfo {
    CharacteristicInfo {
        uuid,
        service_uuid,
        supports_read: properties.contains(CharPropFlags::READ),
        supports_notify: properties.intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE),
    }
}

/// Whether a btleplug characteristic is the one described by `info`.
#[must_use]
pub fn matches(characteristic: &Characteristic, info: &CharacteristicInfo) -> bool {
    characteristic.uuid == info.uuid && characteristic.service_uuid == info.service_uuid
}
