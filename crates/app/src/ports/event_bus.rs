//! Event bus port: publish/subscribe for domain events.

use std::future::Future;

use smarttrack_domain::error::TrackerError;
use smarttrack_domain::event::Event;

/// Publishes domain events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), TrackerError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), TrackerError>> + Send {
        (**self).publish(event)
    }
}
