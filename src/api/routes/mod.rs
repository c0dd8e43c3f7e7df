//! Route handlers.

pub mod monitor;
pub mod streamers;

use axum::Router;

use super::server::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(streamers::router())
        .merge(monitor::router())
        .with_state(state)
}
