use async_trait::async_trait;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushMessageBuilder,
};

use crate::{config::PushSettings, models::PushSubscription};

use super::notify::{DeliveryResult, PushPayload};

pub const NOT_CONFIGURED: &str = "push_not_configured";

#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, payload: &PushPayload) -> DeliveryResult;
}

struct Vapid {
    subject: String,
    private_key_pem: String,
}

/// Web Push delivery signed with the VAPID key pair from settings.
pub struct WebPushSender {
    vapid: Option<Vapid>,
    client: Option<IsahcWebPushClient>,
}

impl WebPushSender {
    pub fn new(settings: &PushSettings) -> Self {
        let vapid = match (&settings.subject, &settings.public_key, &settings.private_key_pem) {
            (Some(subject), Some(_), Some(pem)) => Some(Vapid {
                subject: subject.clone(),
                private_key_pem: pem.clone(),
            }),
            _ => None,
        };

        let client = if vapid.is_some() {
            IsahcWebPushClient::new()
                .map_err(|e| tracing::warn!("web push client disabled: {}", e))
                .ok()
        } else {
            None
        };

        Self { vapid, client }
    }

    pub fn is_configured(&self) -> bool {
        self.vapid.is_some() && self.client.is_some()
    }

    async fn deliver(
        &self,
        vapid: &Vapid,
        client: &IsahcWebPushClient,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), String> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );

        let mut sig = VapidSignatureBuilder::from_pem(vapid.private_key_pem.as_bytes(), &info)
            .map_err(|e| e.to_string())?;
        sig.add_claim("sub", vapid.subject.clone());
        let signature = sig.build().map_err(|e| e.to_string())?;

        let content = serde_json::to_vec(payload).map_err(|e| e.to_string())?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, &content);
        builder.set_vapid_signature(signature);
        let message = builder.build().map_err(|e| e.to_string())?;

        client.send(message).await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl PushChannel for WebPushSender {
    async fn send(&self, subscription: &PushSubscription, payload: &PushPayload) -> DeliveryResult {
        let (Some(vapid), Some(client)) = (&self.vapid, &self.client) else {
            return DeliveryResult::failed(NOT_CONFIGURED);
        };

        match self.deliver(vapid, client, subscription, payload).await {
            Ok(()) => DeliveryResult::sent(),
            Err(e) => DeliveryResult::failed(format!("send_failed: {e}")),
        }
    }
}
