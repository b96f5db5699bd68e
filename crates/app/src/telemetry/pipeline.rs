//! Telemetry pipeline task.
//!
//! Receives raw payloads forwarded by the connection supervisor, decodes
//! them, and fans the result out to the display window, the "last value"
//! watch, the session reading log and the event bus.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use smarttrack_domain::event::{Event, EventKind};
use smarttrack_domain::id::DeviceId;

use super::ingestor::ingest;
use super::windowed_buffer::{WindowReader, WindowWriter, window_channel};
use crate::ports::EventPublisher;

/// One characteristic value from the linked peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub device_id: DeviceId,
    pub characteristic: uuid::Uuid,
    pub bytes: Vec<u8>,
}

impl RawPayload {
    /// Payload text for display and recording. Invalid UTF-8 is replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Messages accepted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryInput {
    Payload(RawPayload),
    /// A new link came up: drop the window and the last value.
    Reset,
}

/// Where raw readings go for session recording.
pub trait ReadingSink: Send + Sync + 'static {
    /// Record one raw payload string. Must not block.
    fn record(&self, raw: &str);
}

impl<T: ReadingSink> ReadingSink for std::sync::Arc<T> {
    fn record(&self, raw: &str) {
        (**self).record(raw);
    }
}

/// Owns the window writer; runs on its own task.
pub struct TelemetryPipeline<S, P> {
    window: WindowWriter,
    last_raw: watch::Sender<Option<String>>,
    sink: S,
    publisher: P,
}

impl<S, P> TelemetryPipeline<S, P>
where
    S: ReadingSink,
    P: EventPublisher + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(max_history: usize, sink: S, publisher: P) -> Self {
        let (window, _) = window_channel(max_history);
        let (last_raw, _) = watch::channel(None);
        Self {
            window,
            last_raw,
            sink,
            publisher,
        }
    }

    /// A reader over the display window.
    #[must_use]
    pub fn window(&self) -> WindowReader {
        self.window.reader()
    }

    /// The most recent raw payload text.
    #[must_use]
    pub fn last_raw(&self) -> watch::Receiver<Option<String>> {
        self.last_raw.subscribe()
    }

    /// Apply one input.
    pub async fn handle(&mut self, input: TelemetryInput) {
        match input {
            TelemetryInput::Reset => {
                self.window.clear();
                self.last_raw.send_replace(None);
            }
            TelemetryInput::Payload(payload) => self.handle_payload(payload).await,
        }
    }

    async fn handle_payload(&mut self, payload: RawPayload) {
        let raw = payload.text();
        let samples = ingest(&payload.bytes);
        let count = samples.len();
        self.window.extend(samples);
        self.sink.record(&raw);
        self.last_raw.send_replace(Some(raw.clone()));
        tracing::trace!(
            device_id = %payload.device_id,
            characteristic = %payload.characteristic,
            samples = count,
            "telemetry received"
        );
        let event = Event::new(EventKind::TelemetryReceived {
            raw,
            samples: count,
        });
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(%err, "failed to publish telemetry event");
        }
    }

    /// Run until every sender of `inputs` is dropped.
    pub fn spawn(mut self, mut inputs: mpsc::Receiver<TelemetryInput>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(input) = inputs.recv().await {
                self.handle(input).await;
            }
            tracing::debug!("telemetry pipeline stopped");
        })
    }
}
