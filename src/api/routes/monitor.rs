//! Monitor lifecycle endpoints: status, pause, schedule, stop.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::control::PauseSchedule;
use crate::report::StatusSnapshot;

use super::super::error::{ApiError, ApiResult};
use super::super::models::{
    MutationResponse, PauseStateResponse, ScheduleResponse, SetPausedRequest, SetScheduleRequest,
    StopRequest,
};
use super::super::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/monitor/pause", get(pause_state).post(set_paused))
        .route("/api/monitor/schedule", get(schedule).post(set_schedule))
        .route("/api/monitor/stop", post(stop))
}

async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.handle.snapshot().status)
}

async fn pause_state(State(state): State<AppState>) -> Json<PauseStateResponse> {
    let snapshot = state.handle.snapshot();
    Json(PauseStateResponse {
        paused: snapshot.paused || snapshot.paused_until.is_some(),
        paused_until: snapshot.paused_until,
    })
}

async fn set_paused(
    State(state): State<AppState>,
    Json(request): Json<SetPausedRequest>,
) -> Json<MutationResponse> {
    match state.handle.set_paused(request.paused).await {
        Ok(()) => Json(MutationResponse::ok()),
        Err(e) => Json(MutationResponse::failed(e.to_string())),
    }
}

async fn schedule(State(state): State<AppState>) -> Json<ScheduleResponse> {
    Json(ScheduleResponse {
        schedule: state.handle.snapshot().schedule,
    })
}

async fn set_schedule(
    State(state): State<AppState>,
    Json(request): Json<SetScheduleRequest>,
) -> ApiResult<Json<MutationResponse>> {
    // Equal endpoints clear the schedule.
    let schedule = PauseSchedule::from_offset_strings(&request.start, &request.end)
        .map_err(|e| ApiError::validation(e.to_string()))?;
    match state.handle.set_schedule(schedule).await {
        Ok(()) => Ok(Json(MutationResponse::ok())),
        Err(e) => Ok(Json(MutationResponse::failed(e.to_string()))),
    }
}

async fn stop(
    State(state): State<AppState>,
    request: Option<Json<StopRequest>>,
) -> Json<MutationResponse> {
    let reason = request
        .and_then(|Json(r)| r.reason)
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "api_request".to_string());
    match state.handle.stop(reason).await {
        Ok(()) => Json(MutationResponse::ok()),
        Err(e) => Json(MutationResponse::failed(e.to_string())),
    }
}
