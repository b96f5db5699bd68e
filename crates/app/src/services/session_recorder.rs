//! Session recorder: lifecycle of one tracking session.
//!
//! `NotStarted → Running ⇄ Paused → Stopped → (saved or discarded) → NotStarted`

use serde::Serialize;

use smarttrack_domain::error::TrackerError;
use smarttrack_domain::id::SessionId;
use smarttrack_domain::session::Session;

use crate::ports::SessionBackend;

/// Where the recorder is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    NotStarted,
    Running,
    Paused,
    Stopped,
}

/// Errors from the session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to submit session {session_id}")]
    SaveFailed {
        session_id: SessionId,
        #[source]
        source: TrackerError,
    },
    #[error("session must be stopped before it is saved")]
    NotStopped,
    #[error("stopped session {session_id} must be saved before a new one starts")]
    NotSaved { session_id: SessionId },
    #[error("no session to {operation}")]
    NoSession { operation: &'static str },
    #[error("failed to serialize session readings")]
    Serialize(#[from] serde_json::Error),
}

/// Result of a successful [`SessionRecorder::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The backend accepted the session.
    Submitted(SessionId),
    /// The session had no readings; nothing was sent.
    NothingToSubmit(SessionId),
}

/// Holds at most one session.
#[derive(Debug)]
pub struct SessionRecorder {
    session: Option<Session>,
    state: RecorderState,
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self {
            session: None,
            state: RecorderState::NotStarted,
        }
    }
}

impl SessionRecorder {
    #[must_use]
    pub fn state(&self) -> RecorderState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Whether readings should currently be accumulated.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == RecorderState::Running
    }

    /// Open a session if none exists. Returns the active session id.
    ///
    /// Starting while running is a no-op; starting while paused resumes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotSaved`] while a stopped session is still
    /// waiting for [`Self::save`].
    pub fn start(&mut self) -> Result<SessionId, SessionError> {
        if let (RecorderState::Stopped, Some(session)) = (self.state, &self.session) {
            return Err(SessionError::NotSaved {
                session_id: session.id,
            });
        }
        let session = self.session.get_or_insert_with(Session::start);
        self.state = RecorderState::Running;
        Ok(session.id)
    }

    /// Suspend reading accumulation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] unless a session is running.
    pub fn pause(&mut self) -> Result<SessionId, SessionError> {
        match (&self.session, self.state) {
            (Some(session), RecorderState::Running | RecorderState::Paused) => {
                self.state = RecorderState::Paused;
                Ok(session.id)
            }
            _ => Err(SessionError::NoSession { operation: "pause" }),
        }
    }

    /// Continue reading accumulation after [`Self::pause`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] unless a session is paused or running.
    pub fn resume(&mut self) -> Result<SessionId, SessionError> {
        match (&self.session, self.state) {
            (Some(session), RecorderState::Running | RecorderState::Paused) => {
                self.state = RecorderState::Running;
                Ok(session.id)
            }
            _ => Err(SessionError::NoSession {
                operation: "resume",
            }),
        }
    }

    /// Close the session and attach `readings`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] when nothing is open, or
    /// [`SessionError::Serialize`] if the readings cannot be encoded.
    pub fn stop(&mut self, readings: &[String]) -> Result<&Session, SessionError> {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|_| self.state != RecorderState::Stopped)
        else {
            return Err(SessionError::NoSession { operation: "stop" });
        };
        session.finish(readings)?;
        self.state = RecorderState::Stopped;
        Ok(session)
    }

    /// Submit the stopped session to `backend`.
    ///
    /// The in-memory session is cleared whatever the backend answers; a
    /// failed submission is reported but not retried.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotStopped`] while a session is still open,
    /// [`SessionError::NoSession`] when there is nothing to save, or
    /// [`SessionError::SaveFailed`] when the backend rejects it.
    #[tracing::instrument(skip_all)]
    pub async fn save<B: SessionBackend>(
        &mut self,
        backend: &B,
    ) -> Result<SaveOutcome, SessionError> {
        match self.state {
            RecorderState::Running | RecorderState::Paused => return Err(SessionError::NotStopped),
            RecorderState::NotStarted => return Err(SessionError::NoSession { operation: "save" }),
            RecorderState::Stopped => {}
        }
        let session = self.session.take();
        self.state = RecorderState::NotStarted;
        let Some(session) = session else {
            return Err(SessionError::NoSession { operation: "save" });
        };

        if !session.has_data() {
            tracing::debug!(session_id = %session.id, "session has no readings, nothing to submit");
            return Ok(SaveOutcome::NothingToSubmit(session.id));
        }
        match backend.add_session(&session).await {
            Ok(()) => {
                tracing::info!(session_id = %session.id, "session submitted");
                Ok(SaveOutcome::Submitted(session.id))
            }
            Err(source) => {
                tracing::warn!(error = %source, session_id = %session.id, "session submission failed, discarding");
                Err(SessionError::SaveFailed {
                    session_id: session.id,
                    source,
                })
            }
        }
    }
}
