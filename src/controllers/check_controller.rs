use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{auth::bearer_token, services::alert_monitor, AppState};

use super::alerts_controller::error_json;

/// Bearer token first, then `x-cron-secret`, then `?secret=`.
fn provided_secret(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<String> {
    bearer_token(headers)
        .or_else(|| {
            headers
                .get("x-cron-secret")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .or_else(|| query.get("secret").cloned())
}

// GET|POST /api/alerts/check
pub async fn check_alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(expected) = state.settings.cron_secret.as_deref() else {
        return error_json(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Missing CRON_SECRET or ALERT_CRON_SECRET",
        );
    };

    if provided_secret(&headers, &query).as_deref() != Some(expected) {
        return error_json(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    match alert_monitor::scan_alerts(&state).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            tracing::error!("alert scan failed: {}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}
