//! Telemetry: from raw notification bytes to the display window.
//!
//! - [`ingestor`] decodes one payload into samples.
//! - [`windowed_buffer`] keeps the most recent triplets for readers.
//! - [`pipeline`] runs both on a task fed by the connection supervisor.

pub mod ingestor;
pub mod pipeline;
pub mod windowed_buffer;

pub use ingestor::{ingest, ingest_at};
pub use pipeline::{RawPayload, ReadingSink, TelemetryInput, TelemetryPipeline};
pub use windowed_buffer::{
    WindowReader, WindowSnapshot, WindowWriter, WindowedBuffer, window_channel,
};
