use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::{
    error::AlertError,
    models::{Alert, CurrentUser},
    services::{
        alerts_service::{self, CreateAlertInput, UpdateAlertInput},
        subscriptions_service::{self, SubscribeInput, UnsubscribeInput},
    },
    AppState,
};

pub fn error_json(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

fn unauthorized() -> Response {
    error_json(StatusCode::UNAUTHORIZED, "Unauthorized")
}

fn alert_error(e: AlertError) -> Response {
    let status = match e {
        AlertError::Invalid(_) => StatusCode::BAD_REQUEST,
        AlertError::NotFound => StatusCode::NOT_FOUND,
        AlertError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_json(status, &e.to_string())
}

fn iso(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn alert_json(a: &Alert) -> serde_json::Value {
    json!({
        "id": a.id.to_hex(),
        "userId": a.user_id,
        "companyId": a.company_id,
        "companySymbol": a.company_symbol,
        "companyName": a.company_name,
        "targetPrice": a.target_price,
        "direction": a.direction.as_str(),
        "comment": a.comment,
        "createdAt": iso(a.created_at),
        "updatedAt": iso(a.updated_at),
        "expiresAt": a.expires_at.and_then(iso),
        "active": a.active,
        "triggeredAt": a.triggered_at.and_then(iso),
        "lastCheckedPrice": a.last_checked_price,
    })
}

// GET /api/alerts
pub async fn get_alerts(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match alerts_service::list_user_alerts(&state, &u.id).await {
        Ok(alerts) => {
            let items: Vec<serde_json::Value> = alerts.iter().map(alert_json).collect();
            (StatusCode::OK, Json(serde_json::Value::Array(items))).into_response()
        }
        Err(e) => alert_error(e),
    }
}

// POST /api/alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Bytes,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let input: CreateAlertInput = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return error_json(StatusCode::BAD_REQUEST, "Invalid alert payload"),
    };

    match alerts_service::create_alert(&state, &u.id, input).await {
        Ok(alert) => (StatusCode::CREATED, Json(alert_json(&alert))).into_response(),
        Err(e) => alert_error(e),
    }
}

// PATCH /api/alerts/:id
pub async fn patch_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
    body: Bytes,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(oid) = ObjectId::parse_str(&id) else {
        return error_json(StatusCode::NOT_FOUND, "Alert not found");
    };

    let input: UpdateAlertInput = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return error_json(StatusCode::BAD_REQUEST, "Invalid alert update payload"),
    };

    match alerts_service::update_alert(&state, &u.id, &oid, input).await {
        Ok(alert) => (StatusCode::OK, Json(alert_json(&alert))).into_response(),
        Err(e) => alert_error(e),
    }
}

// DELETE /api/alerts/:id
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(oid) = ObjectId::parse_str(&id) else {
        return error_json(StatusCode::BAD_REQUEST, "bad id");
    };

    match alerts_service::delete_alert(&state, &u.id, &oid).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(e) => alert_error(e),
    }
}

// POST /api/alerts/subscriptions
pub async fn post_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: Option<Extension<CurrentUser>>,
    body: Bytes,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let input: SubscribeInput = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return error_json(StatusCode::BAD_REQUEST, "Invalid push subscription"),
    };
    if let Err(msg) = subscriptions_service::validate(&input) {
        return error_json(StatusCode::BAD_REQUEST, &msg);
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match subscriptions_service::subscribe(&state, &u.id, input, user_agent).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

// DELETE /api/alerts/subscriptions
pub async fn delete_subscription(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Bytes,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let endpoint = serde_json::from_slice::<UnsubscribeInput>(&body)
        .ok()
        .and_then(|i| i.endpoint)
        .filter(|e| !e.trim().is_empty());
    let Some(endpoint) = endpoint else {
        return error_json(StatusCode::BAD_REQUEST, "Missing endpoint");
    };

    match subscriptions_service::unsubscribe(&state, &u.id, &endpoint).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

// GET /api/push/public-key
pub async fn get_push_public_key(State(state): State<AppState>) -> impl IntoResponse {
    let key = state.settings.push.public_key.clone().unwrap_or_default();
    Json(json!({ "publicKey": key }))
}
