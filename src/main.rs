use std::{net::SocketAddr, sync::Arc};

use mongodb::Client;
use tracing_subscriber::EnvFilter;

use marketalerts::{
    config, routes,
    services::{
        alert_monitor, alert_store::MongoAlertStore, db_init, directory::MongoDirectory,
        email::SmtpMailer, market_price::DseMarketClient, push::WebPushSender,
    },
    templates, AppState,
};

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .map_err(|e| format!("Failed to connect to MongoDB: {e}"))?;
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!("index setup failed: {}", e);
    }

    let hbs = templates::build_handlebars()?;

    let mailer = SmtpMailer::new(&settings.mail, hbs);
    if !mailer.is_configured() {
        tracing::warn!("email notifications disabled: MAIL_* settings incomplete");
    }
    let push = WebPushSender::new(&settings.push);
    if !push.is_configured() {
        tracing::warn!("push notifications disabled: WEB_PUSH_* settings incomplete");
    }
    if settings.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET is not set; /api/alerts/check will refuse requests");
    }

    let state = AppState {
        store: Arc::new(MongoAlertStore::new(&db)),
        directory: Arc::new(MongoDirectory::new(&db)),
        prices: Arc::new(DseMarketClient::new(&settings.market)),
        email: Arc::new(mailer),
        push: Arc::new(push),
        settings: settings.clone(),
    };

    if let Some(every) = settings.scan.interval {
        tracing::info!("scanning alerts every {}s", every.as_secs());
        alert_monitor::spawn_price_alert_monitor(state.clone(), every);
    }

    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .map_err(|e| format!("invalid HOST {}: {e}", settings.host))?;
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| e.to_string())?;
    axum::serve(listener, app).await.map_err(|e| e.to_string())
}
