//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod connection;
#[allow(clippy::missing_errors_doc)]
pub mod session;
pub mod sse;
pub mod telemetry;

use axum::Router;
use axum::routing::{get, post};

use smarttrack_app::ports::{KeyValueStore, SessionBackend};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S, B>() -> Router<AppState<S, B>>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    Router::new()
        // Connection
        .route("/status", get(connection::status::<S, B>))
        .route("/device", get(connection::device::<S, B>))
        .route(
            "/discovery",
            post(connection::discover::<S, B>).delete(connection::stop_discovery::<S, B>),
        )
        .route("/connect", post(connection::connect::<S, B>))
        .route("/retry", post(connection::retry::<S, B>))
        .route("/disconnect", post(connection::disconnect::<S, B>))
        .route("/forget", post(connection::forget::<S, B>))
        // Telemetry
        .route("/telemetry", get(telemetry::window::<S, B>))
        // Session
        .route("/session", get(session::current::<S, B>))
        .route("/session/start", post(session::start::<S, B>))
        .route("/session/pause", post(session::pause::<S, B>))
        .route("/session/resume", post(session::resume::<S, B>))
        .route("/session/stop", post(session::stop::<S, B>))
        .route("/session/save", post(session::save::<S, B>))
        // Events
        .route("/events/stream", get(sse::stream::<S, B>))
}
