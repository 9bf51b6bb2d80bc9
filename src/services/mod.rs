pub mod alert_store;
pub mod directory;
pub mod market_price;
pub mod notify;
pub mod email;
pub mod push;
pub mod evaluator;
pub mod db_init;
pub mod alert_monitor;

pub mod alerts_service;
pub mod subscriptions_service;
