use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;

use super::responses::{error_response, AlertResponse, AlertsResponse, HealthResponse, SyncResponse};
use crate::core::{PassOrigin, QueryError};
use crate::models::AppState;

/// Value of the first `key` occurrence, empty counting as absent.
fn first_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// `GET /alerts`, optionally narrowed by `id` or `days` (never both).
pub async fn list_alerts(State(state): State<AppState>, Query(params): Query<Vec<(String, String)>>) -> Response {
    let id = first_param(&params, "id");
    let days = first_param(&params, "days");

    match (id, days) {
        (Some(_), Some(_)) => error_response(
            StatusCode::BAD_REQUEST,
            "Cannot specify both 'id' and 'days' parameters at the same time",
        ),
        (Some(id), None) => alert_by_id(&state, id).await,
        (None, Some(days)) => alerts_by_days(&state, days).await,
        (None, None) => match state.alerts.all().await {
            Ok(alerts) => Json(AlertsResponse { alerts }).into_response(),
            Err(e) => internal_error("Error getting all alerts", e),
        },
    }
}

async fn alert_by_id(state: &AppState, id: &str) -> Response {
    match state.alerts.by_id(id).await {
        Ok(alert) => Json(AlertResponse { alert }).into_response(),
        Err(QueryError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, "Alert not found"),
        Err(e) => internal_error("Error getting alert by id", e),
    }
}

async fn alerts_by_days(state: &AppState, raw: &str) -> Response {
    let invalid = || error_response(StatusCode::BAD_REQUEST, "Invalid 'days' parameter. Must be a positive integer");

    let Ok(days) = raw.trim().parse::<i64>() else {
        return invalid();
    };

    match state.alerts.within_days(days).await {
        Ok(alerts) => Json(AlertsResponse { alerts }).into_response(),
        Err(QueryError::InvalidWindow(_)) => invalid(),
        Err(e) => internal_error("Error getting alerts by days", e),
    }
}

/// `POST /sync`: starts a pass in the background and answers right away.
pub async fn trigger_sync(State(state): State<AppState>) -> Response {
    state.sync.trigger_now(PassOrigin::Manual);

    (
        StatusCode::ACCEPTED,
        Json(SyncResponse {
            message: "Sync triggered successfully",
            status: "pending",
        }),
    )
        .into_response()
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn use_get() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed. Use GET.")
}

pub async fn use_post() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed. Use POST.")
}

fn internal_error(context: &str, e: QueryError) -> Response {
    error!("[HTTP] {}: {}", context, e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve alerts")
}
