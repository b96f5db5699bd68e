//! Telemetry window handler.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use smarttrack_app::ports::{KeyValueStore, SessionBackend};
use smarttrack_app::telemetry::WindowSnapshot;

use crate::state::AppState;

/// Body of `GET /api/telemetry`.
#[derive(Debug, Serialize)]
pub struct TelemetryView {
    /// Most recent complete triplets, oldest first.
    pub samples: WindowSnapshot,
    /// Text of the latest payload, even when it did not decode.
    pub last_raw: Option<String>,
}

/// `GET /api/telemetry`
pub async fn window<S, B>(State(state): State<AppState<S, B>>) -> Json<TelemetryView>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    Json(TelemetryView {
        samples: state.window.snapshot(),
        last_raw: state.last_raw.borrow().clone(),
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::router;
    use crate::test_support::{Fixture, json_body};

    fn get() -> Request<Body> {
        Request::builder()
            .uri("/api/telemetry")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn should_return_empty_window_before_any_payload() {
        let fixture = Fixture::powered_on();

        let response = router::build(fixture.state.clone())
            .oneshot(get())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["samples"], serde_json::json!([]));
        assert!(body["last_raw"].is_null());
    }

    #[tokio::test]
    async fn should_expose_latest_triplet_and_raw_text() {
        let fixture = Fixture::powered_on();
        fixture.feed("1.5,-2,3").await;
        fixture.feed("garbage").await;

        let response = router::build(fixture.state.clone())
            .oneshot(get())
            .await
            .unwrap();

        let body = json_body(response).await;
        let samples = body["samples"].as_array().unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0]["axis"], "X");
        assert_eq!(samples[0]["value"], 1.5);
        assert_eq!(samples[2]["axis"], "Z");
        assert_eq!(body["last_raw"], "garbage");
    }
}
