//! Streamer registry endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::config::PriorityGroup;

use super::super::error::{ApiError, ApiResult};
use super::super::models::{
    AddStreamerRequest, MutationResponse, ReorderRequest, SetEnabledRequest, StreamerListResponse,
};
use super::super::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/streamers", get(list_streamers).post(add_streamer))
        .route("/api/streamers/{name}", axum::routing::delete(remove_streamer))
        .route("/api/streamers/{name}/enabled", post(set_enabled))
        .route("/api/reorder/{group}", post(reorder))
}

async fn list_streamers(State(state): State<AppState>) -> Json<StreamerListResponse> {
    let snapshot = state.handle.snapshot();
    Json(StreamerListResponse {
        streamers: snapshot.streamers,
    })
}

async fn add_streamer(
    State(state): State<AppState>,
    Json(request): Json<AddStreamerRequest>,
) -> ApiResult<Json<MutationResponse>> {
    if request.name.trim().is_empty() {
        return Err(ApiError::validation("streamer name must be non-empty"));
    }
    let (name, config) = request.into_config();
    Ok(Json(mutation(state.handle.add_streamer(name, config).await)))
}

async fn remove_streamer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<MutationResponse> {
    Json(mutation(state.handle.remove_streamer(name).await))
}

async fn set_enabled(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SetEnabledRequest>,
) -> Json<MutationResponse> {
    Json(mutation(
        state.handle.set_enabled(name, request.enabled).await,
    ))
}

async fn reorder(
    State(state): State<AppState>,
    Path(group): Path<String>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<Json<MutationResponse>> {
    let group: PriorityGroup = group
        .parse()
        .map_err(|e: crate::Error| ApiError::validation(e.to_string()))?;
    Ok(Json(mutation(
        state.handle.reorder(group, request.order).await,
    )))
}

fn mutation(result: crate::Result<()>) -> MutationResponse {
    match result {
        Ok(()) => MutationResponse::ok(),
        Err(e) => MutationResponse::failed(e.to_string()),
    }
}
