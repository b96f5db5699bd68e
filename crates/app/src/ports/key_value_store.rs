//! Key-value store port: the durable string store behind the device registry.

use std::future::Future;

use smarttrack_domain::error::TrackerError;

/// A small synchronous-in-spirit string store (think user defaults).
///
/// Writes are only ever issued from the connection supervisor, so
/// implementations need not handle concurrent writers to the same key.
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, TrackerError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), TrackerError>> + Send;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), TrackerError>> + Send;
}

impl<T: KeyValueStore + Send + Sync> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, TrackerError>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), TrackerError>> + Send {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), TrackerError>> + Send {
        (**self).remove(key)
    }
}
