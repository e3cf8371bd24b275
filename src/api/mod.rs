mod handlers;
mod responses;

use axum::routing::{get, post};
use axum::Router;

use crate::models::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/alerts", get(handlers::list_alerts).fallback(handlers::use_get))
        .route("/sync", post(handlers::trigger_sync).fallback(handlers::use_post))
        .route("/health", get(handlers::health).fallback(handlers::use_get))
        .with_state(state)
}
