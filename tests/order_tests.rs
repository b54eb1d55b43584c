mod common;

use axum::http::StatusCode;
use clubsphere::db::{Booking, BookingStatus};
use common::*;
use serde_json::json;

const MANAGER: &str = "manager@example.com";
const OTHER_MANAGER: &str = "rival@example.com";
const MEMBER: &str = "member@example.com";
const OTHER_MEMBER: &str = "other@example.com";

async fn setup_club() -> (TestApp, String) {
    let app = setup().await;
    app.create_user(MANAGER, "manager").await;
    app.create_user(OTHER_MANAGER, "manager").await;
    app.create_user(MEMBER, "member").await;
    app.create_user(OTHER_MEMBER, "member").await;
    let club_id = app.create_club(MANAGER, "Chess Club", 20.0).await;
    (app, club_id)
}

#[tokio::test]
async fn test_completed_booking_cannot_be_cancelled() {
    let (app, club_id) = setup_club().await;
    let booking = app
        .insert_booking(&club_id, MEMBER, MANAGER, BookingStatus::Completed, 20.0)
        .await;

    let (status, body) = app
        .delete(&format!("/orders/{}", booking.id), Some(MEMBER))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_transition");
    assert_eq!(body["error"]["message"], "Cannot cancel completed orders");

    let (status, body) = app
        .patch(
            &format!("/orders/{}", booking.id),
            Some(MANAGER),
            json!({"status": "cancelled"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_transition");
}

#[tokio::test]
async fn test_cancel_by_customer_or_seller_only() {
    let (app, club_id) = setup_club().await;
    let first = app
        .insert_booking(&club_id, MEMBER, MANAGER, BookingStatus::Confirmed, 20.0)
        .await;
    let second = app
        .insert_booking(&club_id, MEMBER, MANAGER, BookingStatus::Processing, 20.0)
        .await;

    let (status, _) = app
        .delete(&format!("/orders/{}", first.id), Some(OTHER_MEMBER))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .delete(&format!("/orders/{}", first.id), Some(MEMBER))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert!(body["cancelledAt"].is_string());
    assert!(body["completedAt"].is_null());

    let (status, body) = app
        .delete(&format!("/orders/{}", second.id), Some(MANAGER))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, _) = app
        .delete(&format!("/orders/{}", first.id), Some(MEMBER))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.delete("/orders/missing", Some(MEMBER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_write_requires_status_read() {
    let (app, club_id) = setup_club().await;
    let booking = app
        .insert_booking(&club_id, MEMBER, MANAGER, BookingStatus::Confirmed, 20.0)
        .await;

    // Both writers read `confirmed`; the seller's completion lands first
    let completed = Booking::set_status(
        &app.state.db,
        &booking.id,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
    )
    .await
    .unwrap();
    assert!(completed);

    let cancelled = Booking::set_status(
        &app.state.db,
        &booking.id,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
    )
    .await
    .unwrap();
    assert!(!cancelled);

    let stored = Booking::find(&app.state.db, &booking.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status_enum(), BookingStatus::Completed);
    assert!(stored.cancelled_at.is_none());
}

#[tokio::test]
async fn test_seller_status_update() {
    let (app, club_id) = setup_club().await;
    let booking = app
        .insert_booking(&club_id, MEMBER, MANAGER, BookingStatus::Confirmed, 20.0)
        .await;
    let uri = format!("/orders/{}", booking.id);

    let (status, body) = app
        .patch(&uri, Some(MANAGER), json!({"status": "shipped"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = app
        .patch(&uri, Some(OTHER_MANAGER), json!({"status": "completed"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .patch(&uri, Some(MEMBER), json!({"status": "completed"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .patch(&uri, Some(MANAGER), json!({"status": "completed"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert!(body["completedAt"].is_string());

    let (status, body) = app
        .patch(&uri, Some(MANAGER), json!({"status": "completed"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn test_approve_and_reject_pending() {
    let (app, club_id) = setup_club().await;
    let to_approve = app
        .insert_booking(&club_id, MEMBER, MANAGER, BookingStatus::Processing, 20.0)
        .await;
    let to_reject = app
        .insert_booking(&club_id, OTHER_MEMBER, MANAGER, BookingStatus::Processing, 20.0)
        .await;

    let (status, _) = app
        .post(
            &format!("/orders/{}/approve", to_approve.id),
            Some(OTHER_MANAGER),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(&format!("/orders/{}/approve", to_approve.id), Some(MANAGER), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    let (status, body) = app
        .post(&format!("/orders/{}/reject", to_reject.id), Some(MANAGER), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = app
        .post(&format!("/orders/{}/approve", to_approve.id), Some(MANAGER), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_transition");
}

#[tokio::test]
async fn test_order_listings() {
    let (app, club_id) = setup_club().await;
    let other_club = app.create_club(OTHER_MANAGER, "Go Club", 5.0).await;
    app.insert_booking(&club_id, MEMBER, MANAGER, BookingStatus::Confirmed, 20.0)
        .await;
    app.insert_booking(&club_id, OTHER_MEMBER, MANAGER, BookingStatus::Completed, 20.0)
        .await;
    app.insert_booking(&other_club, MEMBER, OTHER_MANAGER, BookingStatus::Confirmed, 5.0)
        .await;

    let (status, body) = app.get("/my-orders", Some(MEMBER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app.get("/manage-orders", Some(MANAGER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app.get("/manage-orders?status=completed", Some(MANAGER)).await;
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["customer"]["email"], OTHER_MEMBER);

    let (status, _) = app.get("/manage-orders", Some(MEMBER)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/manage-orders?status=lost", Some(MANAGER)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/my-orders", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
