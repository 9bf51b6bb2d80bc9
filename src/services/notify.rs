//! Shapes shared by the notification channels.

use num_format::{Locale, ToFormattedString};
use serde::Serialize;

use crate::models::Alert;

/// Outcome of one delivery attempt. `reason` is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub sent: bool,
    pub reason: Option<String>,
}

impl DeliveryResult {
    pub fn sent() -> Self {
        Self { sent: true, reason: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            sent: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub data: PushData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushData {
    pub url: String,
    pub alert_id: String,
    pub company_id: i64,
}

impl PushPayload {
    pub fn for_alert(alert: &Alert, current_price: f64) -> Self {
        Self {
            title: format!("Price alert: {}", alert.company_symbol),
            body: format!(
                "Target TZS {} reached. Current TZS {}.",
                format_amount(alert.target_price),
                format_amount(current_price)
            ),
            data: PushData {
                url: "/".to_string(),
                alert_id: alert.id.to_hex(),
                company_id: alert.company_id,
            },
        }
    }
}

/// Thousands separators, at most two decimals, trailing zeros dropped.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_formatted_string(&Locale::en);
    let frac = cents % 100;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };

    match frac {
        0 => format!("{sign}{whole}"),
        f if f % 10 == 0 => format!("{sign}{whole}.{}", f / 10),
        f => format!("{sign}{whole}.{f:02}"),
    }
}
