use axum::{Router, routing::{get, patch}};
use crate::{AppState, controllers::{alerts_controller, check_controller}};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/alerts", get(alerts_controller::get_alerts).post(alerts_controller::post_create_alert))
        .route("/api/alerts/check", get(check_controller::check_alerts).post(check_controller::check_alerts))
        .route(
            "/api/alerts/subscriptions",
            axum::routing::post(alerts_controller::post_subscription)
                .delete(alerts_controller::delete_subscription),
        )
        .route("/api/alerts/:id", patch(alerts_controller::patch_alert).delete(alerts_controller::delete_alert))
        .route("/api/push/public-key", get(alerts_controller::get_push_public_key))
}
