//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use smarttrack_app::ports::{KeyValueStore, SessionBackend};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Mounts the API under `/api` and a liveness probe at `/health`.
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<S, B>(state: AppState<S, B>) -> Router
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
