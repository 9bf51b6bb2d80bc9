//! Alert decision logic. No I/O.

use crate::models::{Alert, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Expired,
    NoPrice,
    Evaluated { should_trigger: bool },
}

/// Filters out prices that cannot be compared against a target.
pub fn usable_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

pub fn is_expired(alert: &Alert, now_ms: i64) -> bool {
    alert.expires_at.is_some_and(|t| t <= now_ms)
}

/// Boundary is inclusive for both directions.
pub fn should_trigger(direction: Direction, target_price: f64, price: f64) -> bool {
    match direction {
        Direction::Above => price >= target_price,
        Direction::Below => price <= target_price,
    }
}

/// Expiry wins over a price that would also trigger.
pub fn classify(alert: &Alert, price: Option<f64>, now_ms: i64) -> Classification {
    if is_expired(alert, now_ms) {
        return Classification::Expired;
    }

    match usable_price(price) {
        None => Classification::NoPrice,
        Some(p) => Classification::Evaluated {
            should_trigger: should_trigger(alert.direction, alert.target_price, p),
        },
    }
}

/// Direction for a new or re-targeted alert. Without market data the target
/// itself is the reference, which yields `Above`.
pub fn direction_for(target_price: f64, reference: Option<f64>) -> Direction {
    let reference = usable_price(reference).unwrap_or(target_price);
    if target_price >= reference {
        Direction::Above
    } else {
        Direction::Below
    }
}
