//! Tracker: the session side of the UI-facing layer.
//!
//! Owns the [`SessionRecorder`] and the reading log the telemetry pipeline
//! writes into. Readings are only kept while a session is running.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use smarttrack_domain::event::{Event, EventKind};
use smarttrack_domain::id::SessionId;
use smarttrack_domain::session::Session;

use crate::ports::{EventPublisher, SessionBackend};
use crate::services::session_recorder::{
    RecorderState, SaveOutcome, SessionError, SessionRecorder,
};
use crate::telemetry::ReadingSink;

#[derive(Debug, Default)]
struct ReadingLog {
    active: bool,
    lines: Vec<String>,
}

/// Snapshot of the current session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub state: RecorderState,
    pub session: Option<Session>,
    pub readings: usize,
}

/// Drives the session lifecycle and records readings.
pub struct Tracker<B, P> {
    recorder: tokio::sync::Mutex<SessionRecorder>,
    log: Mutex<ReadingLog>,
    backend: B,
    publisher: P,
}

impl<B, P> Tracker<B, P>
where
    B: SessionBackend + Send + Sync,
    P: EventPublisher + Send + Sync,
{
    pub fn new(backend: B, publisher: P) -> Self {
        Self {
            recorder: tokio::sync::Mutex::new(SessionRecorder::default()),
            log: Mutex::new(ReadingLog::default()),
            backend,
            publisher,
        }
    }

    fn with_log<T>(&self, f: impl FnOnce(&mut ReadingLog) -> T) -> T {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut log)
    }

    /// Start recording, opening a session if none exists.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotSaved`] while a stopped session has not
    /// been saved yet.
    pub async fn start_session(&self) -> Result<SessionId, SessionError> {
        let mut recorder = self.recorder.lock().await;
        let fresh = recorder.session().is_none();
        let id = recorder.start()?;
        if fresh {
            self.with_log(|log| {
                log.lines.clear();
                log.active = true;
            });
            tracing::info!(session_id = %id, "session started");
            self.emit(EventKind::SessionStarted { session_id: id }).await;
        } else {
            self.with_log(|log| log.active = true);
        }
        Ok(id)
    }

    /// Stop accumulating readings without closing the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] when no session is open.
    pub async fn pause_session(&self) -> Result<SessionId, SessionError> {
        let id = self.recorder.lock().await.pause()?;
        self.with_log(|log| log.active = false);
        tracing::debug!(session_id = %id, "session paused");
        Ok(id)
    }

    /// Accumulate readings again.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] when no session is open.
    pub async fn resume_session(&self) -> Result<SessionId, SessionError> {
        let id = self.recorder.lock().await.resume()?;
        self.with_log(|log| log.active = true);
        tracing::debug!(session_id = %id, "session resumed");
        Ok(id)
    }

    /// Close the session with the readings collected so far.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] when no session is open.
    pub async fn stop_session(&self) -> Result<Session, SessionError> {
        let mut recorder = self.recorder.lock().await;
        let lines = self.with_log(|log| {
            log.active = false;
            std::mem::take(&mut log.lines)
        });
        let session = recorder.stop(&lines)?.clone();
        tracing::info!(session_id = %session.id, readings = lines.len(), "session stopped");
        self.emit(EventKind::SessionStopped {
            session_id: session.id,
            readings: lines.len(),
        })
        .await;
        Ok(session)
    }

    /// Submit the stopped session to the backend, then discard it.
    ///
    /// # Errors
    ///
    /// See [`SessionRecorder::save`].
    pub async fn save_session(&self) -> Result<SaveOutcome, SessionError> {
        let result = self.recorder.lock().await.save(&self.backend).await;
        match &result {
            Ok(SaveOutcome::Submitted(session_id)) => {
                self.emit(EventKind::SessionSaved {
                    session_id: *session_id,
                })
                .await;
            }
            Err(SessionError::SaveFailed { session_id, .. }) => {
                self.emit(EventKind::SessionSaveFailed {
                    session_id: *session_id,
                })
                .await;
            }
            _ => {}
        }
        result
    }

    /// The current session and how many readings it holds.
    pub async fn current_session(&self) -> SessionView {
        let recorder = self.recorder.lock().await;
        SessionView {
            state: recorder.state(),
            session: recorder.session().cloned(),
            readings: self.with_log(|log| log.lines.len()),
        }
    }

    async fn emit(&self, kind: EventKind) {
        if let Err(err) = self.publisher.publish(Event::new(kind)).await {
            tracing::warn!(%err, "failed to publish session event");
        }
    }
}

impl<B, P> ReadingSink for Tracker<B, P>
where
    B: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn record(&self, raw: &str) {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        if log.active {
            log.lines.push(raw.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use super::*;
    use crate::event_bus::InProcessEventBus;
    use crate::test_support::RecordingBackend;

    fn tracker(
        backend: RecordingBackend,
    ) -> (
        Tracker<RecordingBackend, Arc<InProcessEventBus>>,
        broadcast::Receiver<Event>,
    ) {
        let bus = Arc::new(InProcessEventBus::new(16));
        let events = bus.subscribe();
        (Tracker::new(backend, bus), events)
    }

    #[tokio::test]
    async fn should_ignore_readings_without_session() {
        let (tracker, _events) = tracker(RecordingBackend::default());
        tracker.record("1,2,3");
        assert_eq!(tracker.current_session().await.readings, 0);
    }

    #[tokio::test]
    async fn should_record_only_while_running() {
        let (tracker, _events) = tracker(RecordingBackend::default());
        tracker.start_session().await.unwrap();
        tracker.record("1,2,3");
        tracker.pause_session().await.unwrap();
        tracker.record("dropped");
        tracker.resume_session().await.unwrap();
        tracker.record("4,5,6");

        let session = tracker.stop_session().await.unwrap();

        assert_eq!(
            session.serialized_data.as_deref(),
            Some(r#"["1,2,3","4,5,6"]"#)
        );
        tracker.record("after stop");
        assert_eq!(tracker.current_session().await.readings, 0);
    }

    #[tokio::test]
    async fn should_publish_session_lifecycle_events() {
        let backend = RecordingBackend::default();
        let (tracker, mut events) = tracker(backend.clone());
        let id = tracker.start_session().await.unwrap();
        tracker.record("1,2,3");
        tracker.stop_session().await.unwrap();

        let outcome = tracker.save_session().await.unwrap();

        assert_eq!(outcome, SaveOutcome::Submitted(id));
        assert_eq!(backend.sessions().len(), 1);
        assert_eq!(
            events.recv().await.unwrap().kind,
            EventKind::SessionStarted { session_id: id }
        );
        assert_eq!(
            events.recv().await.unwrap().kind,
            EventKind::SessionStopped {
                session_id: id,
                readings: 1
            }
        );
        assert_eq!(
            events.recv().await.unwrap().kind,
            EventKind::SessionSaved { session_id: id }
        );
    }

    #[tokio::test]
    async fn should_publish_save_failure_and_discard() {
        let (tracker, mut events) = tracker(RecordingBackend::failing());
        let id = tracker.start_session().await.unwrap();
        tracker.record("1,2,3");
        tracker.stop_session().await.unwrap();
        while events.try_recv().is_ok() {}

        assert!(tracker.save_session().await.is_err());

        assert_eq!(
            events.recv().await.unwrap().kind,
            EventKind::SessionSaveFailed { session_id: id }
        );
        let view = tracker.current_session().await;
        assert_eq!(view.state, RecorderState::NotStarted);
        assert!(view.session.is_none());
    }

    #[tokio::test]
    async fn should_keep_stopped_readings_when_start_called_before_save() {
        let (tracker, _events) = tracker(RecordingBackend::default());
        let id = tracker.start_session().await.unwrap();
        tracker.record("1,2,3");
        tracker.stop_session().await.unwrap();

        assert!(matches!(
            tracker.start_session().await,
            Err(SessionError::NotSaved { session_id }) if session_id == id
        ));
        tracker.record("ignored");

        let view = tracker.current_session().await;
        assert_eq!(view.state, RecorderState::Stopped);
        assert_eq!(view.readings, 0);
        assert_eq!(
            view.session.and_then(|s| s.serialized_data).as_deref(),
            Some(r#"["1,2,3"]"#)
        );
    }

    #[tokio::test]
    async fn should_not_restart_readings_when_start_called_twice() {
        let (tracker, _events) = tracker(RecordingBackend::default());
        let first = tracker.start_session().await.unwrap();
        tracker.record("1,2,3");

        let second = tracker.start_session().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(tracker.current_session().await.readings, 1);
    }
}
