//! Bounded display window over telemetry samples.
//!
//! Samples are staged until a full X/Y/Z triplet is present, then flushed to
//! the visible sequence together. The visible sequence holds at most
//! `max_history` triplets and evicts whole triplets, oldest first.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use smarttrack_domain::telemetry::TelemetrySample;

const TRIPLET: usize = 3;

/// Single-writer window with triplet staging.
#[derive(Debug)]
pub struct WindowedBuffer {
    max_history: usize,
    staging: Vec<TelemetrySample>,
    visible: VecDeque<TelemetrySample>,
}

impl WindowedBuffer {
    /// Create a window holding at most `max_history` triplets.
    ///
    /// A `max_history` of zero is raised to one.
    #[must_use]
    pub fn new(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            max_history,
            staging: Vec::with_capacity(TRIPLET),
            visible: VecDeque::with_capacity(max_history * TRIPLET),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_history * TRIPLET
    }

    /// Stage one sample. Returns `true` when this push flushed a triplet.
    pub fn push(&mut self, sample: TelemetrySample) -> bool {
        self.staging.push(sample);
        if self.staging.len() < TRIPLET {
            return false;
        }
        self.visible.extend(self.staging.drain(..));
        while self.visible.len() > self.capacity() {
            self.visible.drain(..TRIPLET);
        }
        true
    }

    /// Empty both staging and the visible sequence.
    pub fn clear(&mut self) {
        self.staging.clear();
        self.visible.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Copy the visible sequence into an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot(self.visible.iter().copied().collect())
    }
}

/// Immutable copy of the visible window, oldest sample first.
///
/// Cheap to clone; iterating never touches the live buffer, so a snapshot
/// can be walked any number of times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSnapshot(Arc<[TelemetrySample]>);

impl Serialize for WindowSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl WindowSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &TelemetrySample> {
        self.0.iter()
    }

    /// The window grouped as X/Y/Z triplets.
    pub fn triplets(&self) -> impl Iterator<Item = &[TelemetrySample]> {
        self.0.chunks_exact(TRIPLET)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[TelemetrySample] {
        &self.0
    }
}

/// Create a connected writer/reader pair over a fresh window.
#[must_use]
pub fn window_channel(max_history: usize) -> (WindowWriter, WindowReader) {
    let (tx, rx) = watch::channel(WindowSnapshot::default());
    (
        WindowWriter {
            buffer: WindowedBuffer::new(max_history),
            tx,
        },
        WindowReader { rx },
    )
}

/// Owning side of the window; publishes a snapshot after each change.
#[derive(Debug)]
pub struct WindowWriter {
    buffer: WindowedBuffer,
    tx: watch::Sender<WindowSnapshot>,
}

impl WindowWriter {
    /// Push samples, publishing once if any triplet was flushed.
    pub fn extend(&mut self, samples: impl IntoIterator<Item = TelemetrySample>) {
        let mut flushed = false;
        for sample in samples {
            flushed |= self.buffer.push(sample);
        }
        if flushed {
            self.tx.send_replace(self.buffer.snapshot());
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.tx.send_replace(WindowSnapshot::default());
    }

    #[must_use]
    pub fn reader(&self) -> WindowReader {
        WindowReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side of the window. Never blocks the writer.
#[derive(Debug, Clone)]
pub struct WindowReader {
    rx: watch::Receiver<WindowSnapshot>,
}

impl WindowReader {
    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> WindowSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next published snapshot.
    ///
    /// Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<WindowSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
