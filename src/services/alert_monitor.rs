use std::{
    collections::{BTreeSet, HashMap},
    future::Future,
    sync::Arc,
    time::Duration,
};

use chrono::Utc;
use futures_util::{future::join_all, stream, StreamExt};
use mongodb::bson::oid::ObjectId;
use tokio::time;

use crate::{
    error::{ScanError, StoreError},
    models::{Alert, AlertPatch, PushSubscription, ScanReport, UserContact},
    AppState,
};

use super::{
    evaluator::{self, Classification},
    notify::PushPayload,
};

/// Runs scans on a fixed interval. Only started when
/// `ALERT_SCAN_INTERVAL_SECS` is set; the check endpoint is the usual trigger.
pub fn spawn_price_alert_monitor(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if let Err(e) = scan_alerts(&state).await {
                tracing::error!("[alert-monitor] scan error: {}", e);
            }
        }
    });
}

/// One full pass over the active alerts.
pub async fn scan_alerts(state: &AppState) -> Result<ScanReport, ScanError> {
    scan_alerts_at(state, Utc::now().timestamp_millis()).await
}

/// Every external call gets its own deadline; `None` means it ran out.
async fn bounded<F: Future>(limit: Duration, fut: F) -> Option<F::Output> {
    time::timeout(limit, fut).await.ok()
}

pub async fn scan_alerts_at(state: &AppState, now: i64) -> Result<ScanReport, ScanError> {
    let opts = &state.settings.scan;

    let alerts = match bounded(opts.call_timeout, state.store.list_active()).await {
        Some(Ok(v)) => v,
        Some(Err(e)) => return Err(ScanError::Load(e.to_string())),
        None => return Err(ScanError::Load("timed out".to_string())),
    };

    if alerts.is_empty() {
        return Ok(ScanReport::default());
    }

    let scanned = alerts.len();
    let (expired_now, candidates): (Vec<Alert>, Vec<Alert>) = alerts
        .into_iter()
        .partition(|a| evaluator::classify(a, None, now) == Classification::Expired);
    let expired_count = expired_now.len();

    let symbols: Vec<String> = candidates
        .iter()
        .map(|a| a.company_symbol.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // Expiry writes and price lookups touch disjoint alerts.
    let ((), prices) = tokio::join!(
        deactivate_expired(state, expired_now, now),
        fetch_prices(state, symbols),
    );

    let firing: Vec<(Alert, f64)> = candidates
        .into_iter()
        .filter_map(|a| {
            let price = prices.get(&a.company_symbol).copied();
            match evaluator::classify(&a, price, now) {
                Classification::Evaluated { should_trigger: true } => price.map(|p| (a, p)),
                _ => None,
            }
        })
        .collect();

    let mut report = ScanReport {
        scanned,
        triggered: firing.len(),
        deactivated: expired_count + firing.len(),
        ..ScanReport::default()
    };

    if !firing.is_empty() {
        let user_ids: BTreeSet<String> = firing.iter().map(|(a, _)| a.user_id.clone()).collect();
        let recipients = Arc::new(resolve_recipients(state, user_ids).await);

        let outcomes: Vec<DispatchOutcome> = stream::iter(firing)
            .map(|(alert, price)| {
                notify_and_finalize(state.clone(), recipients.clone(), alert, price, now)
            })
            .buffer_unordered(opts.concurrency)
            .collect()
            .await;

        for o in outcomes {
            report.sent_emails += usize::from(o.email_sent);
            report.sent_push += o.push_sent;
        }
    }

    tracing::info!(
        "alert scan: scanned={} triggered={} deactivated={} emails={} push={}",
        report.scanned,
        report.triggered,
        report.deactivated,
        report.sent_emails,
        report.sent_push
    );

    Ok(report)
}

/// Returns true only when the write landed. A stale row means another pass
/// got there first.
fn log_update(kind: &str, alert: &Alert, res: Option<Result<Alert, StoreError>>) -> bool {
    match res {
        Some(Ok(_)) => true,
        Some(Err(StoreError::NotFoundOrStale)) => {
            tracing::debug!("{} {}: already inactive", kind, alert.id);
            false
        }
        Some(Err(e)) => {
            tracing::warn!("{} {}: {}", kind, alert.id, e);
            false
        }
        None => {
            tracing::warn!("{} {}: store update timed out", kind, alert.id);
            false
        }
    }
}

async fn deactivate_expired(state: &AppState, expired: Vec<Alert>, now: i64) {
    stream::iter(expired)
        .map(|alert| expire_one(state.clone(), alert, now))
        .buffer_unordered(state.settings.scan.concurrency)
        .collect::<Vec<()>>()
        .await;
}

async fn expire_one(state: AppState, alert: Alert, now: i64) {
    let limit = state.settings.scan.call_timeout;
    let patch = AlertPatch::expired(now);
    let res = bounded(limit, state.store.update(&alert.id, &patch, true)).await;
    log_update("expire", &alert, res);
}

/// One lookup per distinct symbol. Unknown prices are left out of the map.
async fn fetch_prices(state: &AppState, symbols: Vec<String>) -> HashMap<String, f64> {
    let found: Vec<(String, Option<Option<f64>>)> = stream::iter(symbols)
        .map(|symbol| lookup_price(state.clone(), symbol))
        .buffer_unordered(state.settings.scan.concurrency)
        .collect()
        .await;

    let mut prices = HashMap::new();
    for (symbol, res) in found {
        match res {
            Some(price) => match evaluator::usable_price(price) {
                Some(p) => {
                    prices.insert(symbol, p);
                }
                None => tracing::debug!("no usable price for {}", symbol),
            },
            None => tracing::warn!("price lookup for {} timed out", symbol),
        }
    }
    prices
}

async fn lookup_price(state: AppState, symbol: String) -> (String, Option<Option<f64>>) {
    let limit = state.settings.scan.call_timeout;
    let found = bounded(limit, state.prices.get(&symbol)).await;
    (symbol, found)
}

/// Scan-local memo of who gets told. Built once per pass, dropped with it.
#[derive(Debug, Default)]
struct Recipients {
    contacts: HashMap<String, UserContact>,
    subscriptions: HashMap<String, Vec<PushSubscription>>,
}

async fn resolve_recipients(state: &AppState, user_ids: BTreeSet<String>) -> Recipients {
    let contacts = stream::iter(user_ids.iter().cloned().collect::<Vec<_>>())
        .map(|user_id| lookup_contact(state.clone(), user_id))
        .buffer_unordered(state.settings.scan.concurrency)
        .collect::<HashMap<_, _>>();

    let (contacts, subscriptions) =
        tokio::join!(contacts, list_subscriptions(state.clone(), user_ids));

    Recipients {
        contacts,
        subscriptions,
    }
}

async fn lookup_contact(state: AppState, user_id: String) -> (String, UserContact) {
    let limit = state.settings.scan.call_timeout;
    let contact = match bounded(limit, state.directory.get_contact(&user_id)).await {
        Some(Ok(c)) => c,
        Some(Err(e)) => {
            tracing::warn!("contact lookup for {}: {}", user_id, e);
            UserContact::default()
        }
        None => {
            tracing::warn!("contact lookup for {} timed out", user_id);
            UserContact::default()
        }
    };
    (user_id, contact)
}

async fn list_subscriptions(
    state: AppState,
    user_ids: BTreeSet<String>,
) -> HashMap<String, Vec<PushSubscription>> {
    let limit = state.settings.scan.call_timeout;
    match bounded(limit, state.directory.list_push_subscriptions(&user_ids)).await {
        Some(Ok(m)) => m,
        Some(Err(e)) => {
            tracing::warn!("push subscription listing: {}", e);
            HashMap::new()
        }
        None => {
            tracing::warn!("push subscription listing timed out");
            HashMap::new()
        }
    }
}

#[derive(Debug, Default)]
struct DispatchOutcome {
    email_sent: bool,
    push_sent: usize,
}

/// Both channels are attempted before the alert is closed; their results
/// never stop the close.
async fn notify_and_finalize(
    state: AppState,
    recipients: Arc<Recipients>,
    alert: Alert,
    price: f64,
    now: i64,
) -> DispatchOutcome {
    let limit = state.settings.scan.call_timeout;
    let contact = recipients.contacts.get(&alert.user_id).cloned().unwrap_or_default();
    let subs = recipients
        .subscriptions
        .get(&alert.user_id)
        .cloned()
        .unwrap_or_default();

    let payload = PushPayload::for_alert(&alert, price);
    let pushes = join_all(
        subs.into_iter()
            .map(|sub| push_one(state.clone(), sub, payload.clone(), alert.id)),
    );

    let (email_sent, push_results) = tokio::join!(
        email_one(state.clone(), contact, alert.clone(), price),
        pushes,
    );
    let push_sent = push_results.into_iter().filter(|sent| *sent).count();

    let patch = AlertPatch::triggered(price, now);
    let res = bounded(limit, state.store.update(&alert.id, &patch, true)).await;
    log_update("trigger", &alert, res);

    DispatchOutcome {
        email_sent,
        push_sent,
    }
}

async fn email_one(state: AppState, contact: UserContact, alert: Alert, price: f64) -> bool {
    let Some(to) = contact.email.as_deref() else {
        return false;
    };
    let limit = state.settings.scan.call_timeout;

    match bounded(limit, state.email.send(to, contact.name.as_deref(), &alert, price)).await {
        Some(r) if r.sent => true,
        Some(r) => {
            tracing::warn!(
                "email for alert {} not sent: {}",
                alert.id,
                r.reason.as_deref().unwrap_or("unknown")
            );
            false
        }
        None => {
            tracing::warn!("email for alert {} timed out", alert.id);
            false
        }
    }
}

async fn push_one(
    state: AppState,
    sub: PushSubscription,
    payload: PushPayload,
    alert_id: ObjectId,
) -> bool {
    let limit = state.settings.scan.call_timeout;

    match bounded(limit, state.push.send(&sub, &payload)).await {
        Some(r) if r.sent => true,
        Some(r) => {
            tracing::warn!(
                "push for alert {} to {} not sent: {}",
                alert_id,
                sub.endpoint,
                r.reason.as_deref().unwrap_or("unknown")
            );
            false
        }
        None => {
            tracing::warn!("push for alert {} to {} timed out", alert_id, sub.endpoint);
            false
        }
    }
}
