use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::{
    error::AlertError,
    models::{alert::normalize_comment, Alert, AlertPatch},
    AppState,
};

use super::evaluator;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertInput {
    pub company_id: i64,
    pub company_symbol: String,
    pub company_name: String,
    pub target_price: f64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Absent keys leave a field untouched; explicit `null` clears `comment`
/// and `expiresAt`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertInput {
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default, deserialize_with = "explicit")]
    pub comment: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub expires_at: Option<Option<String>>,
    #[serde(default)]
    pub active: Option<bool>,
}

fn explicit<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn invalid(msg: &str) -> AlertError {
    AlertError::Invalid(msg.to_string())
}

fn valid_price(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// RFC 3339 timestamp to unix millis.
pub fn parse_timestamp(raw: &str) -> Result<i64, AlertError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc).timestamp_millis())
        .map_err(|_| invalid("expiresAt must be an ISO-8601 datetime"))
}

fn check_comment(raw: Option<&str>) -> Result<Option<String>, AlertError> {
    let comment = normalize_comment(raw);
    if comment.as_ref().is_some_and(|c| c.chars().count() > 500) {
        return Err(invalid("comment is too long"));
    }
    Ok(comment)
}

pub async fn list_user_alerts(state: &AppState, user_id: &str) -> Result<Vec<Alert>, AlertError> {
    Ok(state.store.list_for_user(user_id).await?)
}

/// Latest market price, or `None` when the lookup did not produce one.
async fn reference_price(state: &AppState, symbol: &str) -> Option<f64> {
    let limit = state.settings.scan.call_timeout;
    let found = tokio::time::timeout(limit, state.prices.get(symbol)).await.ok().flatten();
    evaluator::usable_price(found)
}

pub async fn create_alert(
    state: &AppState,
    user_id: &str,
    input: CreateAlertInput,
) -> Result<Alert, AlertError> {
    let symbol = input.company_symbol.trim().to_string();
    let name = input.company_name.trim().to_string();

    if input.company_id <= 0 {
        return Err(invalid("companyId must be positive"));
    }
    if symbol.is_empty() || symbol.chars().count() > 20 {
        return Err(invalid("companySymbol must be 1-20 characters"));
    }
    if name.is_empty() || name.chars().count() > 200 {
        return Err(invalid("companyName must be 1-200 characters"));
    }
    if !valid_price(input.target_price) {
        return Err(invalid("targetPrice must be positive"));
    }

    let comment = check_comment(input.comment.as_deref())?;
    let expires_at = input.expires_at.as_deref().map(parse_timestamp).transpose()?;

    let market = reference_price(state, &symbol).await;
    let reference = market.unwrap_or(input.target_price);
    let now = Utc::now().timestamp_millis();

    let alert = Alert {
        id: ObjectId::new(),
        user_id: user_id.to_string(),
        company_id: input.company_id,
        company_symbol: symbol,
        company_name: name,
        target_price: input.target_price,
        direction: evaluator::direction_for(input.target_price, market),
        comment,
        expires_at,
        active: true,
        triggered_at: None,
        last_checked_price: Some(reference),
        created_at: now,
        updated_at: now,
    };

    state.store.insert(&alert).await?;

    tracing::info!("alert {} created for {} ({})", alert.id, alert.company_symbol, alert.direction.as_str());
    Ok(alert)
}

/// Only a target edit recomputes direction; re-activation clears
/// `triggered_at` and nothing else.
pub async fn update_alert(
    state: &AppState,
    user_id: &str,
    alert_id: &ObjectId,
    input: UpdateAlertInput,
) -> Result<Alert, AlertError> {
    if input.target_price.is_none()
        && input.comment.is_none()
        && input.expires_at.is_none()
        && input.active.is_none()
    {
        return Err(invalid("No fields provided for update"));
    }
    if input.target_price.is_some_and(|p| !valid_price(p)) {
        return Err(invalid("targetPrice must be positive"));
    }

    let existing = state
        .store
        .find_for_user(alert_id, user_id)
        .await?
        .ok_or(AlertError::NotFound)?;

    let mut patch = AlertPatch {
        updated_at: Utc::now().timestamp_millis(),
        ..AlertPatch::default()
    };

    if let Some(target) = input.target_price {
        let market = reference_price(state, &existing.company_symbol).await;
        patch.target_price = Some(target);
        patch.direction = Some(evaluator::direction_for(target, market));
        patch.last_checked_price = Some(market.unwrap_or(target));
    }

    if let Some(comment) = &input.comment {
        patch.comment = Some(check_comment(comment.as_deref())?);
    }

    if let Some(expires) = &input.expires_at {
        patch.expires_at = Some(expires.as_deref().map(parse_timestamp).transpose()?);
    }

    if let Some(active) = input.active {
        patch.active = Some(active);
        if active {
            patch.triggered_at = Some(None);
        }
    }

    Ok(state.store.update(&existing.id, &patch, false).await?)
}

pub async fn delete_alert(state: &AppState, user_id: &str, alert_id: &ObjectId) -> Result<(), AlertError> {
    state.store.delete_for_user(alert_id, user_id).await?;
    Ok(())
}
