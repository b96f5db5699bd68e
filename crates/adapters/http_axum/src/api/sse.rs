//! Server-Sent Events (SSE) stream for real-time updates.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use smarttrack_app::ports::{KeyValueStore, SessionBackend};
use smarttrack_domain::event::Event as DomainEvent;

use crate::state::AppState;

fn to_sse(event: &DomainEvent) -> Option<Event> {
    match Event::default().json_data(event) {
        Ok(sse) => Some(sse),
        Err(err) => {
            tracing::warn!(%err, "failed to serialize event for SSE stream");
            None
        }
    }
}

/// `GET /api/events/stream`: SSE stream of domain events.
///
/// Each frame's `data:` is the JSON-encoded event. The stream lasts until
/// the client disconnects; a lagging client silently skips events.
pub async fn stream<S, B>(
    State(state): State<AppState<S, B>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => to_sse(&event).map(Ok),
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "SSE subscriber lagged, some events were dropped");
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
