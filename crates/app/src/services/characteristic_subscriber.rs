//! Characteristic subscriber: activates telemetry on a fresh link.
//!
//! Walks the remote GATT topology, issues one read on every readable
//! characteristic and enables notifications on every notify-capable one.
//! Failures are collected, never raised: a link whose topology could not be
//! walked stays connected.

use smarttrack_domain::error::TrackerError;
use smarttrack_domain::id::DeviceId;

use crate::ports::{CharacteristicInfo, RadioAdapter};

/// What activation achieved on one link.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscriptionReport {
    pub services: usize,
    pub reads: usize,
    pub subscriptions: usize,
    pub errors: Vec<String>,
}

impl SubscriptionReport {
    /// Whether the link ended up streaming without any error.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.subscriptions > 0
    }

    /// Human-readable reason when the report is not complete.
    #[must_use]
    pub fn incomplete_detail(&self) -> Option<String> {
        if self.is_complete() {
            return None;
        }
        if !self.errors.is_empty() {
            return Some(self.errors.join("; "));
        }
        if self.services == 0 {
            return Some("no services discovered".to_owned());
        }
        Some("no notify-capable characteristic found".to_owned())
    }

    fn error(&mut self, what: impl std::fmt::Display, err: &TrackerError) {
        tracing::warn!(%err, "{what} failed");
        self.errors.push(format!("{what}: {err}"));
    }
}

/// Runs activation against one radio.
pub struct CharacteristicSubscriber<R> {
    radio: R,
}

impl<R: RadioAdapter> CharacteristicSubscriber<R> {
    pub fn new(radio: R) -> Self {
        Self { radio }
    }

    /// Discover services and characteristics of `id` and activate them.
    #[tracing::instrument(skip(self), fields(device_id = %id))]
    pub async fn activate(&self, id: &DeviceId) -> SubscriptionReport {
        let mut report = SubscriptionReport::default();
        let services = match self.radio.discover_services(id).await {
            Ok(services) => services,
            Err(err) => {
                report.error("service discovery", &err);
                return report;
            }
        };
        report.services = services.len();

        for service in &services {
            match self.radio.discover_characteristics(id, service).await {
                Ok(characteristics) => {
                    for characteristic in &characteristics {
                        self.activate_one(id, characteristic, &mut report).await;
                    }
                }
                Err(err) => {
                    report.error(
                        format_args!("characteristic discovery of {}", service.uuid),
                        &err,
                    );
                }
            }
        }
        tracing::debug!(
            services = report.services,
            reads = report.reads,
            subscriptions = report.subscriptions,
            "characteristics activated"
        );
        report
    }

    async fn activate_one(
        &self,
        id: &DeviceId,
        characteristic: &CharacteristicInfo,
        report: &mut SubscriptionReport,
    ) {
        if characteristic.supports_read {
            match self.radio.read(id, characteristic).await {
                Ok(()) => report.reads += 1,
                Err(err) => report.error(format_args!("read of {}", characteristic.uuid), &err),
            }
        }
        if characteristic.supports_notify {
            match self.radio.subscribe(id, characteristic).await {
                Ok(()) => report.subscriptions += 1,
                Err(err) => report.error(
                    format_args!("subscription to {}", characteristic.uuid),
                    &err,
                ),
            }
        }
    }
}
