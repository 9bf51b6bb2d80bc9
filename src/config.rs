use std::{env, time::Duration};

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub cron_secret: Option<String>,

    pub market: MarketSettings,
    pub mail: MailSettings,
    pub push: PushSettings,
    pub scan: ScanSettings,
}

#[derive(Debug, Clone)]
pub struct MarketSettings {
    pub data_url: String,
    pub cache_ttl: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    // "ssl" forces implicit TLS on ports other than 465
    pub encryption: Option<String>,
    pub from_address: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct PushSettings {
    pub subject: Option<String>,
    pub public_key: Option<String>,
    pub private_key_pem: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub concurrency: usize,
    pub call_timeout: Duration,
    // None: scans only run when the check endpoint is called
    pub interval: Option<Duration>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            call_timeout: Duration::from_millis(8000),
            interval: None,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "market_alerts".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = parsed::<u16>("PORT").unwrap_or(3000);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-dev-secret".to_string());
    let cron_secret = non_empty("CRON_SECRET").or_else(|| non_empty("ALERT_CRON_SECRET"));

    let market = MarketSettings {
        data_url: env::var("MARKET_DATA_URL")
            .unwrap_or_else(|_| "https://api.dse.co.tz/api/market-data?isBond=false".to_string()),
        cache_ttl: Duration::from_secs(parsed("MARKET_DATA_TTL_SECS").unwrap_or(30)),
        timeout: Duration::from_millis(parsed("MARKET_DATA_TIMEOUT_MS").unwrap_or(6000)),
    };

    let mail_username = non_empty("MAIL_USERNAME");
    let mail = MailSettings {
        host: non_empty("MAIL_HOST"),
        port: parsed("MAIL_PORT").unwrap_or(465),
        password: non_empty("MAIL_PASSWORD"),
        encryption: non_empty("MAIL_ENCRYPTION"),
        from_address: non_empty("MAIL_FROM_ADDRESS")
            .or_else(|| mail_username.clone())
            .unwrap_or_else(|| "noreply@example.com".to_string()),
        from_name: non_empty("MAIL_FROM_NAME").unwrap_or_else(|| "DSE Dashboard".to_string()),
        username: mail_username,
    };

    let push = PushSettings {
        subject: non_empty("WEB_PUSH_SUBJECT"),
        public_key: non_empty("WEB_PUSH_PUBLIC_KEY"),
        private_key_pem: non_empty("WEB_PUSH_PRIVATE_KEY_PEM"),
    };

    let defaults = ScanSettings::default();
    let scan = ScanSettings {
        concurrency: parsed::<usize>("SCAN_CONCURRENCY")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.concurrency),
        call_timeout: parsed::<u64>("SCAN_CALL_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.call_timeout),
        interval: parsed::<u64>("ALERT_SCAN_INTERVAL_SECS")
            .filter(|s| *s > 0)
            .map(Duration::from_secs),
    };

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        jwt_secret,
        cron_secret,
        market,
        mail,
        push,
        scan,
    }
}
