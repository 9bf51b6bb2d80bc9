//! Library entrypoint for market-alerts.
//!
//! The binary wires Mongo, SMTP and Web Push collaborators into `AppState`;
//! integration tests under `tests/` swap in their own.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;
pub mod templates;

pub mod controllers;
pub mod routes;

use services::{
    alert_store::AlertStore, directory::SubscriptionDirectory, email::EmailChannel,
    market_price::PriceLookup, push::PushChannel,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: Arc<dyn AlertStore>,
    pub directory: Arc<dyn SubscriptionDirectory>,
    pub prices: Arc<dyn PriceLookup>,
    pub email: Arc<dyn EmailChannel>,
    pub push: Arc<dyn PushChannel>,
}
