use chrono::Utc;
use serde::Deserialize;

use crate::{error::DirectoryError, models::PushSubscription, AppState};

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Shape of `PushSubscription.toJSON()` in the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeInput {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnsubscribeInput {
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn valid_endpoint(endpoint: &str) -> bool {
    let rest = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"));
    rest.is_some_and(|r| !r.is_empty() && !r.contains(char::is_whitespace))
}

pub fn validate(input: &SubscribeInput) -> Result<(), String> {
    if !valid_endpoint(input.endpoint.trim()) {
        return Err("Invalid push subscription".to_string());
    }
    if input.keys.p256dh.trim().is_empty() || input.keys.auth.trim().is_empty() {
        return Err("Invalid push subscription".to_string());
    }
    Ok(())
}

pub async fn subscribe(
    state: &AppState,
    user_id: &str,
    input: SubscribeInput,
    user_agent: Option<String>,
) -> Result<(), DirectoryError> {
    let sub = PushSubscription {
        user_id: user_id.to_string(),
        endpoint: input.endpoint.trim().to_string(),
        p256dh: input.keys.p256dh.trim().to_string(),
        auth: input.keys.auth.trim().to_string(),
        user_agent,
        updated_at: Utc::now().timestamp_millis(),
    };

    state.directory.save_subscription(&sub).await
}

pub async fn unsubscribe(state: &AppState, user_id: &str, endpoint: &str) -> Result<(), DirectoryError> {
    state.directory.remove_subscription(user_id, endpoint).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(endpoint: &str, p256dh: &str, auth: &str) -> SubscribeInput {
        SubscribeInput {
            endpoint: endpoint.to_string(),
            keys: SubscriptionKeys {
                p256dh: p256dh.to_string(),
                auth: auth.to_string(),
            },
        }
    }

    #[test]
    fn accepts_browser_subscription() {
        assert!(validate(&input("https://fcm.googleapis.com/fcm/send/abc", "BPk", "q1")).is_ok());
    }

    #[test]
    fn rejects_non_url_or_missing_keys() {
        assert!(validate(&input("not a url", "BPk", "q1")).is_err());
        assert!(validate(&input("https://", "BPk", "q1")).is_err());
        assert!(validate(&input("https://push.example/x", "", "q1")).is_err());
        assert!(validate(&input("https://push.example/x", "BPk", " ")).is_err());
    }
}
