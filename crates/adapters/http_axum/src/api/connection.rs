//! JSON handlers for the connection state machine.

use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use smarttrack_app::ports::{KeyValueStore, SessionBackend};
use smarttrack_app::services::connection_supervisor::SupervisorStatus;
use smarttrack_domain::device::DeviceRef;
use smarttrack_domain::id::DeviceId;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /api/connect`.
///
/// Without a `device_id` the remembered device is used.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    pub device_id: Option<String>,
    pub name: Option<String>,
}

/// Query parameters for `POST /api/discovery`.
#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryParams {
    pub window_secs: Option<u64>,
}

/// Possible responses from the connect and retry endpoints.
pub enum ConnectResponse {
    Connected(Json<DeviceRef>),
}

impl IntoResponse for ConnectResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Connected(json) => json.into_response(),
        }
    }
}

/// Possible responses from commands that return nothing.
pub enum CommandResponse {
    Accepted,
    NoContent,
}

impl IntoResponse for CommandResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted => StatusCode::ACCEPTED.into_response(),
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/status`
pub async fn status<S, B>(State(state): State<AppState<S, B>>) -> Json<SupervisorStatus>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    Json(state.supervisor.status())
}

/// `GET /api/device`: the remembered device.
pub async fn device<S, B>(State(state): State<AppState<S, B>>) -> Result<Json<DeviceRef>, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    let device = state
        .registry
        .recall()
        .await?
        .ok_or(ApiError::NotFound("remembered device"))?;
    Ok(Json(device))
}

/// `POST /api/discovery`: list nearby devices for a while.
pub async fn discover<S, B>(
    State(state): State<AppState<S, B>>,
    Query(params): Query<DiscoveryParams>,
) -> Result<CommandResponse, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    let window = params.window_secs.map(Duration::from_secs);
    state.supervisor.discover(window).await?;
    Ok(CommandResponse::Accepted)
}

/// `DELETE /api/discovery`
pub async fn stop_discovery<S, B>(
    State(state): State<AppState<S, B>>,
) -> Result<CommandResponse, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    state.supervisor.stop_discovery().await?;
    Ok(CommandResponse::NoContent)
}

/// `POST /api/connect`: resolves once the device is connected or the
/// attempt has failed.
pub async fn connect<S, B>(
    State(state): State<AppState<S, B>>,
    Json(req): Json<ConnectRequest>,
) -> Result<ConnectResponse, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    let device = match req.device_id {
        Some(id) => DeviceRef::new(DeviceId::new(id)?, req.name),
        None => state
            .registry
            .recall()
            .await?
            .ok_or(ApiError::NotFound("remembered device"))?,
    };
    let connected = state.supervisor.connect(device).await?;
    Ok(ConnectResponse::Connected(Json(connected)))
}

/// `POST /api/retry`
pub async fn retry<S, B>(State(state): State<AppState<S, B>>) -> Result<ConnectResponse, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    let connected = state.supervisor.retry().await?;
    Ok(ConnectResponse::Connected(Json(connected)))
}

/// `POST /api/disconnect`
pub async fn disconnect<S, B>(
    State(state): State<AppState<S, B>>,
) -> Result<CommandResponse, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    state.supervisor.disconnect().await?;
    Ok(CommandResponse::NoContent)
}

/// `POST /api/forget`
pub async fn forget<S, B>(State(state): State<AppState<S, B>>) -> Result<CommandResponse, ApiError>
where
    S: KeyValueStore + Send + Sync + 'static,
    B: SessionBackend + Send + Sync + 'static,
{
    state.supervisor.forget_device().await?;
    Ok(CommandResponse::NoContent)
}
