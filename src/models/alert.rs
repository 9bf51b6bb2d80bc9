use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    // auth subject of the owner
    pub user_id: String,

    pub company_id: i64,
    pub company_symbol: String,
    pub company_name: String,

    pub target_price: f64,
    pub direction: Direction,

    #[serde(default)]
    pub comment: Option<String>,

    // unix millis
    #[serde(default)]
    pub expires_at: Option<i64>,

    pub active: bool,

    #[serde(default)]
    pub triggered_at: Option<i64>,
    #[serde(default)]
    pub last_checked_price: Option<f64>,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Partial update applied to a stored alert. `None` leaves a field as is;
/// the nested `Option`s distinguish "clear" from "leave".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertPatch {
    pub target_price: Option<f64>,
    pub direction: Option<Direction>,
    pub comment: Option<Option<String>>,
    pub expires_at: Option<Option<i64>>,
    pub active: Option<bool>,
    pub triggered_at: Option<Option<i64>>,
    pub last_checked_price: Option<f64>,
    pub updated_at: i64,
}

impl AlertPatch {
    pub fn expired(now: i64) -> Self {
        Self {
            active: Some(false),
            updated_at: now,
            ..Self::default()
        }
    }

    pub fn triggered(price: f64, now: i64) -> Self {
        Self {
            active: Some(false),
            triggered_at: Some(Some(now)),
            last_checked_price: Some(price),
            updated_at: now,
            ..Self::default()
        }
    }

    pub fn apply(&self, alert: &mut Alert) {
        if let Some(v) = self.target_price {
            alert.target_price = v;
        }
        if let Some(v) = self.direction {
            alert.direction = v;
        }
        if let Some(v) = &self.comment {
            alert.comment = v.clone();
        }
        if let Some(v) = self.expires_at {
            alert.expires_at = v;
        }
        if let Some(v) = self.active {
            alert.active = v;
        }
        if let Some(v) = self.triggered_at {
            alert.triggered_at = v;
        }
        if let Some(v) = self.last_checked_price {
            alert.last_checked_price = Some(v);
        }
        alert.updated_at = self.updated_at;
    }
}

/// Trims free text and folds an empty result into `None`.
pub fn normalize_comment(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
