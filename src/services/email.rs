use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;

use crate::{
    config::MailSettings,
    models::{Alert, Direction},
    templates::{Hbs, ALERT_EMAIL},
};

use super::notify::{format_amount, DeliveryResult};

pub const NOT_CONFIGURED: &str = "mailer_not_configured";

#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send(
        &self,
        to: &str,
        recipient_name: Option<&str>,
        alert: &Alert,
        current_price: f64,
    ) -> DeliveryResult;
}

pub fn subject_for(alert: &Alert) -> String {
    format!("Price alert triggered: {}", alert.company_symbol)
}

fn format_expiry(expires_at: Option<i64>) -> String {
    match expires_at.and_then(DateTime::<Utc>::from_timestamp_millis) {
        Some(t) => format!("Expiry: {}", t.format("%Y-%m-%d %H:%M UTC")),
        None => "No expiry".to_string(),
    }
}

pub fn render_body(
    hbs: &Hbs,
    recipient_name: Option<&str>,
    alert: &Alert,
    current_price: f64,
) -> Result<String, String> {
    let movement = match alert.direction {
        Direction::Above => "rose to",
        Direction::Below => "dropped to",
    };

    let ctx = json!({
        "recipient": recipient_name.unwrap_or("there"),
        "symbol": alert.company_symbol,
        "target": format_amount(alert.target_price),
        "movement": movement,
        "current": format_amount(current_price),
        "expiry_note": format_expiry(alert.expires_at),
        "comment": alert.comment,
    });

    hbs.render(ALERT_EMAIL, &ctx).map_err(|e| e.to_string())
}

/// SMTP delivery. Without host and credentials every send reports
/// `mailer_not_configured`.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Option<Mailbox>,
    hbs: Hbs,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings, hbs: Hbs) -> Self {
        let transport = match build_transport(settings) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("smtp transport disabled: {}", e);
                None
            }
        };

        let from = format!("{} <{}>", settings.from_name, settings.from_address)
            .parse::<Mailbox>()
            .map_err(|e| tracing::warn!("invalid MAIL_FROM_ADDRESS: {}", e))
            .ok();

        Self { transport, from, hbs }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some() && self.from.is_some()
    }
}

fn build_transport(
    settings: &MailSettings,
) -> Result<Option<AsyncSmtpTransport<Tokio1Executor>>, String> {
    let (Some(host), Some(username), Some(password)) = (
        settings.host.as_deref(),
        settings.username.clone(),
        settings.password.clone(),
    ) else {
        return Ok(None);
    };

    let implicit_tls = settings.port == 465
        || settings
            .encryption
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case("ssl"));

    let builder = if implicit_tls {
        AsyncSmtpTransport::<Tokio1Executor>::relay(host)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
    }
    .map_err(|e| e.to_string())?;

    Ok(Some(
        builder
            .port(settings.port)
            .credentials(Credentials::new(username, password))
            .build(),
    ))
}

#[async_trait]
impl EmailChannel for SmtpMailer {
    async fn send(
        &self,
        to: &str,
        recipient_name: Option<&str>,
        alert: &Alert,
        current_price: f64,
    ) -> DeliveryResult {
        let (Some(transport), Some(from)) = (&self.transport, &self.from) else {
            return DeliveryResult::failed(NOT_CONFIGURED);
        };

        let to = match to.parse::<Mailbox>() {
            Ok(m) => m,
            Err(e) => return DeliveryResult::failed(format!("invalid_recipient: {e}")),
        };

        let body = match render_body(&self.hbs, recipient_name, alert, current_price) {
            Ok(b) => b,
            Err(e) => return DeliveryResult::failed(format!("template_error: {e}")),
        };

        let message = match Message::builder()
            .from(from.clone())
            .to(to)
            .subject(subject_for(alert))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
        {
            Ok(m) => m,
            Err(e) => return DeliveryResult::failed(format!("build_failed: {e}")),
        };

        match transport.send(message).await {
            Ok(_) => DeliveryResult::sent(),
            Err(e) => DeliveryResult::failed(format!("send_failed: {e}")),
        }
    }
}
