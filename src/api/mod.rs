pub mod auth;
mod bookmarks;
mod clubs;
pub mod error;
mod events;
mod manager;
mod orders;
mod payments;
mod users;
pub mod validation;
mod webhooks;

use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let club_routes = Router::new()
        .route("/clubs", get(clubs::list_clubs).post(clubs::create_club))
        .route(
            "/clubs/:id",
            get(clubs::get_club)
                .patch(clubs::update_club)
                .delete(clubs::delete_club),
        )
        .route("/clubs/:id/status", patch(clubs::update_club_status))
        .route("/clubs/:id/join", post(clubs::join_club))
        .route(
            "/clubs/:id/bookmark",
            post(bookmarks::bookmark_club).delete(bookmarks::unbookmark_club),
        );

    let payment_routes = Router::new()
        .route("/create-checkout-session", post(payments::create_checkout_session))
        .route("/verify-payment/:session_id", get(payments::verify_payment));

    let order_routes = Router::new()
        .route("/my-orders", get(orders::my_orders))
        .route("/manage-orders", get(orders::manage_orders))
        .route(
            "/orders/:id",
            patch(orders::update_order_status).delete(orders::cancel_order),
        )
        .route("/orders/:id/approve", post(orders::approve_order))
        .route("/orders/:id/reject", post(orders::reject_order));

    let user_routes = Router::new()
        .route("/user", post(users::upsert_user))
        .route("/user/role", get(users::get_role))
        .route("/become-manager", post(users::become_manager))
        .route("/manager-requests", get(users::list_manager_requests))
        .route("/update-role", patch(users::update_role))
        .route("/users", get(users::list_users));

    let manager_routes = Router::new()
        .route("/manager/statistics", get(manager::statistics))
        .route("/manager/clubs", get(manager::clubs))
        .route("/manager/upcoming-events", get(manager::upcoming_events))
        .route("/manager/pending-requests", get(manager::pending_requests))
        .route("/manager/all-registrations", get(manager::all_registrations));

    let event_routes = Router::new()
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/register", post(events::register))
        .route("/events/:id/cancel", post(events::cancel_registration))
        .route("/events/:id/registrations", get(events::list_registrations))
        .route(
            "/events/:id/registrations/:registration_id",
            patch(events::adjudicate_registration),
        )
        .route(
            "/events/:id/bookmark",
            post(bookmarks::bookmark_event).delete(bookmarks::unbookmark_event),
        )
        .route("/my-registrations", get(events::my_registrations))
        .route("/bookmarks", get(bookmarks::list_bookmarks));

    let webhook_routes = Router::new().route("/stripe", post(webhooks::stripe_webhook));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(club_routes)
        .merge(payment_routes)
        .merge(order_routes)
        .merge(user_routes)
        .merge(manager_routes)
        .merge(event_routes)
        .nest("/webhooks", webhook_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "clubsphere",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check() -> &'static str {
    "OK"
}
