use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::MarketSettings;

/// Best-known current price for a symbol. `None` means unknown; lookups
/// never fail loudly.
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn get(&self, symbol: &str) -> Option<f64>;
}

#[derive(Debug, Deserialize)]
pub struct MarketDataRow {
    #[serde(default)]
    pub company: Option<MarketCompany>,

    #[serde(rename = "marketPrice", default)]
    pub market_price: Option<Value>,

    #[serde(rename = "openingPrice", default)]
    pub opening_price: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct MarketCompany {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// The upstream mixes JSON numbers with strings like "1,250".
pub fn to_number(v: Option<&Value>) -> f64 {
    let parsed = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.replace(',', "").trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

impl MarketDataRow {
    /// Market price, falling back to the opening price.
    pub fn price(&self) -> Option<f64> {
        let market = to_number(self.market_price.as_ref());
        if market > 0.0 {
            return Some(market);
        }
        let opening = to_number(self.opening_price.as_ref());
        (opening > 0.0).then_some(opening)
    }
}

pub fn index_snapshot(rows: Vec<MarketDataRow>) -> HashMap<String, f64> {
    let mut prices = HashMap::new();
    for row in rows {
        let Some(symbol) = row.company.as_ref().and_then(|c| c.symbol.clone()) else {
            continue;
        };
        if let Some(p) = row.price() {
            prices.entry(symbol).or_insert(p);
        }
    }
    prices
}

type Snapshot = Arc<HashMap<String, f64>>;

/// Reads the exchange-wide market snapshot and caches it for a short TTL so a
/// whole scan pass shares one upstream request.
#[derive(Clone)]
pub struct DseMarketClient {
    http: Client,
    url: String,
    ttl: Duration,
    cache: Arc<Mutex<Option<(Instant, Snapshot)>>>,
}

impl DseMarketClient {
    pub fn new(settings: &MarketSettings) -> Self {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            url: settings.data_url.clone(),
            ttl: settings.cache_ttl,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    async fn fetch_snapshot(&self) -> Result<HashMap<String, f64>, String> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            return Err(format!("market data request failed: {}", res.status()));
        }

        let rows = res
            .json::<Vec<MarketDataRow>>()
            .await
            .map_err(|e| e.to_string())?;

        Ok(index_snapshot(rows))
    }

    /// Serves the cached snapshot while fresh; a failed refresh is not cached.
    async fn snapshot(&self) -> Option<Snapshot> {
        let mut guard = self.cache.lock().await;

        if let Some((at, snap)) = guard.as_ref() {
            if at.elapsed() < self.ttl {
                return Some(snap.clone());
            }
        }

        match self.fetch_snapshot().await {
            Ok(prices) => {
                let snap = Arc::new(prices);
                *guard = Some((Instant::now(), snap.clone()));
                Some(snap)
            }
            Err(e) => {
                tracing::warn!("market snapshot fetch failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl PriceLookup for DseMarketClient {
    async fn get(&self, symbol: &str) -> Option<f64> {
        let snap = self.snapshot().await?;
        snap.get(symbol).copied()
    }
}
