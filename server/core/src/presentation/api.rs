// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP surface for the mission scheduler.
//!
//! Bearer-token-authenticated JSON. Definitions may be served slightly stale
//! (the GET response advertises `max-age=15, stale-while-revalidate=30`);
//! `activeMissions` is authoritative only from the freshest response.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::application::lifecycle::{MissionOutcome, MissionService, StartMissionCommand};
use crate::domain::errors::MissionError;
use crate::domain::mission::InstanceId;
use crate::domain::player::PlayerId;
use crate::infrastructure::auth::{AuthError, Authenticator};

pub struct AppState {
    pub missions: Arc<dyn MissionService>,
    pub auth: Arc<dyn Authenticator>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/missions", get(list_missions).post(start_mission))
        .route("/missions/{id}/complete", post(complete_mission))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Wire error shape: `{ "error": "...", "details": {...}? }` with the status
/// code carrying the retry class (400 validation, 404 not found, 409
/// conflict/capacity, 500 transient).
pub struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, err.to_string())
    }
}

impl From<MissionError> for ApiError {
    fn from(err: MissionError) -> Self {
        match err {
            MissionError::MissionIdRequired | MissionError::AgentIdRequired => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            MissionError::DefinitionNotFound
            | MissionError::AgentNotFound
            | MissionError::InstanceNotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            MissionError::AgentBusy { .. }
            | MissionError::MissionInProgress
            | MissionError::Transition(_) => Self::new(StatusCode::CONFLICT, err.to_string()),
            MissionError::SlotsExhausted(ref exhausted) => Self {
                status: StatusCode::CONFLICT,
                body: json!({
                    "error": err.to_string(),
                    "details": {
                        "totalSlots": exhausted.total_slots,
                        "occupiedSlots": exhausted.occupied_slots,
                    },
                }),
            },
            MissionError::Storage(ref storage) => {
                error!(error = %storage, "storage failure serving mission request");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<PlayerId, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::Missing)?;
    Ok(state.auth.resolve(token).await?)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_missions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let player = authenticate(&state, &headers).await?;
    let board = state.missions.list_missions(player).await?;

    let mut response = Json(board).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=15, stale-while-revalidate=30"),
    );
    Ok(response)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartMissionRequest {
    #[serde(default)]
    mission_id: Option<String>,
    #[serde(default)]
    agent_id: Option<String>,
}

async fn start_mission(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<StartMissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let player = authenticate(&state, &headers).await?;

    let mission_id = payload
        .mission_id
        .filter(|s| !s.trim().is_empty())
        .ok_or(MissionError::MissionIdRequired)?;
    let agent_id = payload
        .agent_id
        .filter(|s| !s.trim().is_empty())
        .ok_or(MissionError::AgentIdRequired)?;

    let view = state
        .missions
        .start_mission(player, StartMissionCommand { mission_id, agent_id })
        .await?;

    Ok(Json(json!({ "success": true, "missionInstance": view })))
}

async fn complete_mission(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(outcome): Json<MissionOutcome>,
) -> Result<impl IntoResponse, ApiError> {
    let player = authenticate(&state, &headers).await?;

    let instance_id =
        InstanceId::from_string(&id).map_err(|_| MissionError::InstanceNotFound)?;

    let instance = state
        .missions
        .complete_mission(player, instance_id, outcome)
        .await?;

    Ok(Json(json!({ "success": true, "missionInstance": instance })))
}
