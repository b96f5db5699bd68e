//! JSON handlers for the tracking session lifecycle.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use smarttrack_app::ports::{KeyValueStore, SessionBackend};
use smarttrack_app::services::session_recorder::SaveOutcome;
use smarttrack_app::tracker::SessionView;
use smarttrack_domain::id::SessionId;
use smarttrack_domain::session::Session;

use crate::error::ApiError;
use crate::state::AppState;

/// Body returned by start, pause and resume.
#[derive(Debug, Serialize)]
pub struct SessionRef {
    pub session_id: SessionId,
}

/// Body returned by save.
#[derive(Debug, Serialize)]
pub struct SaveResult {
    pub session_id: SessionId,
    /// `false` when the session had no readings and was dropped unsent.
    pub submitted: bool,
}

impl From<SaveOutcome> for SaveResult {
    fn from(outcome: SaveOutcome) -> Self {
        match outcome {
            SaveOutcome::Submitted(session_id) => Self {
                session_id,
                submitted: true,
            },
            SaveOutcome::NothingToSubmit(session_id) => Self {
                session_id,
                submitted: false,
            },
        }
    }
}

/// `GET /api/session`
pub async fn current<S, B>(State(state): State<AppState<S, B>>) -> Json<SessionView>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    Json(state.tracker.current_session().await)
}

/// `POST /api/session/start`
pub async fn start<S, B>(State(state): State<AppState<S, B>>) -> Result<Json<SessionRef>, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    let session_id = state.tracker.start_session().await?;
    Ok(Json(SessionRef { session_id }))
}

/// `POST /api/session/pause`
pub async fn pause<S, B>(State(state): State<AppState<S, B>>) -> Result<Json<SessionRef>, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    let session_id = state.tracker.pause_session().await?;
    Ok(Json(SessionRef { session_id }))
}

/// `POST /api/session/resume`
pub async fn resume<S, B>(
    State(state): State<AppState<S, B>>,
) -> Result<Json<SessionRef>, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    let session_id = state.tracker.resume_session().await?;
    Ok(Json(SessionRef { session_id }))
}

/// `POST /api/session/stop`
pub async fn stop<S, B>(State(state): State<AppState<S, B>>) -> Result<Json<Session>, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    Ok(Json(state.tracker.stop_session().await?))
}

/// `POST /api/session/save`
pub async fn save<S, B>(State(state): State<AppState<S, B>>) -> Result<Json<SaveResult>, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    let outcome = state.tracker.save_session().await?;
    Ok(Json(outcome.into()))
}
