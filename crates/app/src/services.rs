//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod characteristic_subscriber;
pub mod connection_supervisor;
pub mod device_registry;
pub mod scanner;
pub mod session_recorder;
