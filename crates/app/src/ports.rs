//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod event_bus;
pub mod key_value_store;
pub mod radio;
pub mod session_backend;

pub use event_bus::EventPublisher;
pub use key_value_store::KeyValueStore;
pub use radio::{AdapterEvents, CharacteristicInfo, DiscoveredPeripheral, RadioAdapter, ServiceInfo};
pub use session_backend::SessionBackend;
