//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use smarttrack_app::services::connection_supervisor::ConnectError;
use smarttrack_app::services::session_recorder::SessionError;
use smarttrack_domain::connection::FailureReason;
use smarttrack_domain::error::TrackerError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Connect(ConnectError),
    Session(SessionError),
    Tracker(TrackerError),
    NotFound(&'static str),
}

impl From<ConnectError> for ApiError {
    fn from(err: ConnectError) -> Self {
        Self::Connect(err)
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        Self::Tracker(err)
    }
}

fn internal(err: &dyn std::error::Error) -> (StatusCode, String) {
    tracing::error!(error = %err, source = ?err.source().map(ToString::to_string), "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_string(),
    )
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Connect(err) => {
                let status = match err {
                    ConnectError::Failed(FailureReason::AdapterNotReady { .. })
                    | ConnectError::AdapterNotReady(_)
                    | ConnectError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
                    ConnectError::Failed(FailureReason::ConnectTimeout) => {
                        StatusCode::GATEWAY_TIMEOUT
                    }
                    ConnectError::Failed(FailureReason::LinkLost) => StatusCode::BAD_GATEWAY,
                    ConnectError::Superseded
                    | ConnectError::Cancelled
                    | ConnectError::InvalidTransition { .. } => StatusCode::CONFLICT,
                    ConnectError::Registry(_) => return internal(err),
                };
                let message = match err {
                    ConnectError::Failed(reason) => reason.message().to_string(),
                    other => other.to_string(),
                };
                (status, message)
            }
            Self::Session(err) => match err {
                SessionError::NoSession { .. }
                | SessionError::NotStopped
                | SessionError::NotSaved { .. } => {
                    (StatusCode::CONFLICT, err.to_string())
                }
                SessionError::SaveFailed { .. } => {
                    tracing::warn!(error = %err, "session backend rejected the session");
                    (StatusCode::BAD_GATEWAY, err.to_string())
                }
                SessionError::Serialize(_) => internal(err),
            },
            Self::Tracker(TrackerError::InvalidDeviceId) => {
                (StatusCode::BAD_REQUEST, TrackerError::InvalidDeviceId.to_string())
            }
            Self::Tracker(err) => internal(err),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
