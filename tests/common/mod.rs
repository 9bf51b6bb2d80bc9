#![allow(dead_code)]

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use marketalerts::{
    config,
    error::{DirectoryError, StoreError},
    models::{Alert, AlertPatch, Direction, PushSubscription, UserContact},
    services::{
        alert_store::AlertStore,
        directory::SubscriptionDirectory,
        email::EmailChannel,
        market_price::PriceLookup,
        notify::{DeliveryResult, PushPayload},
        push::PushChannel,
    },
    AppState,
};

pub const NOW: i64 = 1_760_000_000_000;
pub const DAY_MS: i64 = 86_400_000;

pub fn alert(user_id: &str, symbol: &str, target: f64, direction: Direction) -> Alert {
    Alert {
        id: ObjectId::new(),
        user_id: user_id.to_string(),
        company_id: 7,
        company_symbol: symbol.to_string(),
        company_name: format!("{symbol} PLC"),
        target_price: target,
        direction,
        comment: None,
        expires_at: None,
        active: true,
        triggered_at: None,
        last_checked_price: Some(target),
        created_at: NOW - DAY_MS,
        updated_at: NOW - DAY_MS,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub rows: Mutex<Vec<Alert>>,
    pub list_calls: Mutex<usize>,
    // (id, patch) for every write that landed
    pub writes: Mutex<Vec<(ObjectId, AlertPatch)>>,
    pub failing_ids: Mutex<HashSet<ObjectId>>,
    pub slow_ids: Mutex<HashSet<ObjectId>>,
    pub fail_load: Mutex<bool>,
}

impl MemoryStore {
    pub fn with(rows: Vec<Alert>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    pub fn get(&self, id: &ObjectId) -> Option<Alert> {
        self.rows.lock().unwrap().iter().find(|a| a.id == *id).cloned()
    }

    pub fn writes_for(&self, id: &ObjectId) -> usize {
        self.writes.lock().unwrap().iter().filter(|(w, _)| w == id).count()
    }

    pub fn total_writes(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn list_active(&self) -> Result<Vec<Alert>, StoreError> {
        *self.list_calls.lock().unwrap() += 1;
        if *self.fail_load.lock().unwrap() {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        Ok(self.rows.lock().unwrap().iter().filter(|a| a.active).cloned().collect())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Alert>, StoreError> {
        let mut items: Vec<Alert> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn find_for_user(&self, id: &ObjectId, user_id: &str) -> Result<Option<Alert>, StoreError> {
        Ok(self.get(id).filter(|a| a.user_id == user_id))
    }

    async fn insert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.rows.lock().unwrap().push(alert.clone());
        Ok(())
    }

    async fn update(
        &self,
        id: &ObjectId,
        patch: &AlertPatch,
        require_active: bool,
    ) -> Result<Alert, StoreError> {
        if self.failing_ids.lock().unwrap().contains(id) {
            return Err(StoreError::Backend("write failed".to_string()));
        }
        let slow = self.slow_ids.lock().unwrap().contains(id);
        if slow {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }

        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|a| a.id == *id && (!require_active || a.active))
            .ok_or(StoreError::NotFoundOrStale)?;

        patch.apply(row);
        self.writes.lock().unwrap().push((*id, patch.clone()));
        Ok(row.clone())
    }

    async fn delete_for_user(&self, id: &ObjectId, user_id: &str) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|a| !(a.id == *id && a.user_id == user_id));
        Ok(rows.len() < before)
    }
}

#[derive(Default)]
pub struct FakePrices {
    pub prices: HashMap<String, f64>,
    pub slow: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakePrices {
    pub fn with(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            ..Self::default()
        }
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|s| *s == symbol).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PriceLookup for FakePrices {
    async fn get(&self, symbol: &str) -> Option<f64> {
        self.calls.lock().unwrap().push(symbol.to_string());
        if self.slow.contains(symbol) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.prices.get(symbol).copied()
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    pub contacts: HashMap<String, UserContact>,
    pub subscriptions: HashMap<String, Vec<PushSubscription>>,
    pub contact_calls: Mutex<Vec<String>>,
    pub listing_calls: Mutex<usize>,
    pub saved: Mutex<Vec<PushSubscription>>,
    pub removed: Mutex<Vec<(String, String)>>,
    pub unavailable: bool,
}

impl FakeDirectory {
    pub fn contact(mut self, user_id: &str, email: &str, name: Option<&str>) -> Self {
        self.contacts.insert(
            user_id.to_string(),
            UserContact {
                email: Some(email.to_string()),
                name: name.map(str::to_string),
            },
        );
        self
    }

    pub fn subscription(mut self, user_id: &str, endpoint: &str) -> Self {
        self.subscriptions
            .entry(user_id.to_string())
            .or_default()
            .push(PushSubscription {
                user_id: user_id.to_string(),
                endpoint: endpoint.to_string(),
                p256dh: "BPk".to_string(),
                auth: "q1".to_string(),
                user_agent: None,
                updated_at: NOW,
            });
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn total_calls(&self) -> usize {
        self.contact_calls.lock().unwrap().len() + *self.listing_calls.lock().unwrap()
    }
}

#[async_trait]
impl SubscriptionDirectory for FakeDirectory {
    async fn get_contact(&self, user_id: &str) -> Result<UserContact, DirectoryError> {
        self.contact_calls.lock().unwrap().push(user_id.to_string());
        if self.unavailable {
            return Err(DirectoryError::Backend("directory unavailable".to_string()));
        }
        Ok(self.contacts.get(user_id).cloned().unwrap_or_default())
    }

    async fn list_push_subscriptions(
        &self,
        user_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, Vec<PushSubscription>>, DirectoryError> {
        *self.listing_calls.lock().unwrap() += 1;
        if self.unavailable {
            return Err(DirectoryError::Backend("directory unavailable".to_string()));
        }
        Ok(self
            .subscriptions
            .iter()
            .filter(|(u, _)| user_ids.contains(*u))
            .map(|(u, s)| (u.clone(), s.clone()))
            .collect())
    }

    async fn save_subscription(&self, sub: &PushSubscription) -> Result<(), DirectoryError> {
        self.saved.lock().unwrap().push(sub.clone());
        Ok(())
    }

    async fn remove_subscription(&self, user_id: &str, endpoint: &str) -> Result<(), DirectoryError> {
        self.removed
            .lock()
            .unwrap()
            .push((user_id.to_string(), endpoint.to_string()));
        Ok(())
    }
}

pub struct FakeEmail {
    pub succeed: bool,
    pub slow: bool,
    pub sent_to: Mutex<Vec<(String, ObjectId, f64)>>,
}

impl FakeEmail {
    pub fn new(succeed: bool) -> Self {
        Self {
            succeed,
            slow: false,
            sent_to: Mutex::new(Vec::new()),
        }
    }

    pub fn slow() -> Self {
        Self {
            slow: true,
            ..Self::new(true)
        }
    }

    pub fn calls(&self) -> usize {
        self.sent_to.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailChannel for FakeEmail {
    async fn send(
        &self,
        to: &str,
        _recipient_name: Option<&str>,
        alert: &Alert,
        current_price: f64,
    ) -> DeliveryResult {
        self.sent_to
            .lock()
            .unwrap()
            .push((to.to_string(), alert.id, current_price));
        if self.slow {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.succeed {
            DeliveryResult::sent()
        } else {
            DeliveryResult::failed("mailer_not_configured")
        }
    }
}

#[derive(Default)]
pub struct FakePush {
    pub failing_endpoints: HashSet<String>,
    pub slow_endpoints: HashSet<String>,
    pub payloads: Mutex<Vec<(String, PushPayload)>>,
}

impl FakePush {
    pub fn failing(endpoints: &[&str]) -> Self {
        Self {
            failing_endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn slow(endpoints: &[&str]) -> Self {
        Self {
            slow_endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }
}

#[async_trait]
impl PushChannel for FakePush {
    async fn send(&self, subscription: &PushSubscription, payload: &PushPayload) -> DeliveryResult {
        self.payloads
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), payload.clone()));
        if self.slow_endpoints.contains(&subscription.endpoint) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.failing_endpoints.contains(&subscription.endpoint) {
            DeliveryResult::failed("send_failed: 410 Gone")
        } else {
            DeliveryResult::sent()
        }
    }
}

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub prices: Arc<FakePrices>,
    pub directory: Arc<FakeDirectory>,
    pub email: Arc<FakeEmail>,
    pub push: Arc<FakePush>,
}

pub fn test_settings() -> config::Settings {
    let mut settings = config::load();
    settings.jwt_secret = "test-secret".to_string();
    settings.cron_secret = Some("cron-secret".to_string());
    settings.push.public_key = Some("BPublicKey".to_string());
    settings.scan.concurrency = 4;
    settings.scan.call_timeout = Duration::from_millis(200);
    settings.scan.interval = None;
    settings
}

pub fn harness(
    store: MemoryStore,
    prices: FakePrices,
    directory: FakeDirectory,
    email: FakeEmail,
    push: FakePush,
) -> Harness {
    let store = Arc::new(store);
    let prices = Arc::new(prices);
    let directory = Arc::new(directory);
    let email = Arc::new(email);
    let push = Arc::new(push);

    let state = AppState {
        settings: test_settings(),
        store: store.clone(),
        directory: directory.clone(),
        prices: prices.clone(),
        email: email.clone(),
        push: push.clone(),
    };

    Harness {
        state,
        store,
        prices,
        directory,
        email,
        push,
    }
}
