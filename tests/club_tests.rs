mod common;

use axum::http::StatusCode;
use clubsphere::db::BookingStatus;
use common::*;
use serde_json::json;

const MANAGER: &str = "manager@example.com";
const OTHER_MANAGER: &str = "rival@example.com";
const ADMIN: &str = "admin@example.com";
const MEMBER: &str = "member@example.com";

async fn setup_people() -> TestApp {
    let app = setup().await;
    app.create_user(MANAGER, "manager").await;
    app.create_user(OTHER_MANAGER, "manager").await;
    app.create_user(ADMIN, "admin").await;
    app.create_user(MEMBER, "member").await;
    app
}

#[tokio::test]
async fn test_create_club_starts_pending() {
    let app = setup_people().await;
    let club_id = app.create_club(MANAGER, "Chess Club", 25.0).await;

    let (status, body) = app.get(&format!("/clubs/{}", club_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Chess Club");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["seller"]["email"], MANAGER);
    assert_eq!(body["price"], 25.0);
}

#[tokio::test]
async fn test_create_club_requires_manager_role() {
    let app = setup_people().await;

    let (status, body) = app
        .post(
            "/clubs",
            Some(MEMBER),
            json!({"name": "Book Club", "category": "Reading", "price": 0}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["details"]["role"], "member");

    let (status, body) = app
        .post(
            "/clubs",
            Some("stranger@example.com"),
            json!({"name": "Book Club", "category": "Reading", "price": 0}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"]["details"]["role"].is_null());

    let (status, _) = app
        .post("/clubs", None, json!({"name": "Book Club", "category": "Reading"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_club_validation() {
    let app = setup_people().await;

    let (status, body) = app
        .post(
            "/clubs",
            Some(MANAGER),
            json!({"name": "X", "category": "", "price": -3}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    let details = &body["error"]["details"];
    assert!(details["name"].is_array());
    assert!(details["category"].is_array());
    assert!(details["price"].is_array());
}

#[tokio::test]
async fn test_list_clubs_filters() {
    let app = setup_people().await;
    let chess = app.create_club(MANAGER, "Chess Club", 10.0).await;
    app.create_club(MANAGER, "Running Crew", 0.0).await;

    let (status, body) = app.get("/clubs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app.get("/clubs?search=chess", None).await;
    let clubs = body.as_array().unwrap();
    assert_eq!(clubs.len(), 1);
    assert_eq!(clubs[0]["id"], chess.as_str());

    let (_, body) = app.get("/clubs?status=approved", None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = app.get("/clubs?status=archived", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_missing_club_is_404() {
    let app = setup_people().await;
    let (status, body) = app.get("/clubs/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_update_club_owner_admin_and_others() {
    let app = setup_people().await;
    let club_id = app.create_club(MANAGER, "Chess Club", 10.0).await;
    let uri = format!("/clubs/{}", club_id);

    let (status, body) = app.patch(&uri, Some(MANAGER), json!({"price": 12.5})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], 12.5);
    assert_eq!(body["name"], "Chess Club");

    let (status, body) = app
        .patch(&uri, Some(ADMIN), json!({"location": "Chattogram"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"], "Chattogram");

    let (status, _) = app
        .patch(&uri, Some(OTHER_MANAGER), json!({"price": 1.0}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.patch(&uri, Some(MEMBER), json!({"price": 1.0})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.patch(&uri, Some(MANAGER), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_admin_sets_club_status() {
    let app = setup_people().await;
    let club_id = app.create_club(MANAGER, "Chess Club", 10.0).await;
    let uri = format!("/clubs/{}/status", club_id);

    let (status, _) = app
        .patch(&uri, Some(MANAGER), json!({"status": "approved"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .patch(&uri, Some(ADMIN), json!({"status": "approved"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, _) = app
        .patch(&uri, Some(ADMIN), json!({"status": "featured"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch("/clubs/missing/status", Some(ADMIN), json!({"status": "rejected"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_free_join_then_duplicate_conflicts() {
    let app = setup_people().await;
    let club_id = app.create_club(MANAGER, "Running Crew", 0.0).await;
    let uri = format!("/clubs/{}/join", club_id);

    let (status, body) = app.post(&uri, Some(MEMBER), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["customer"]["email"], MEMBER);
    assert_eq!(body["seller"]["email"], MANAGER);
    assert_eq!(body["price"], 0.0);

    let (status, body) = app.post(&uri, Some(MEMBER), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_join_after_cancelling_free_membership() {
    let app = setup_people().await;
    let club_id = app.create_club(MANAGER, "Running Crew", 0.0).await;
    let uri = format!("/clubs/{}/join", club_id);

    let (_, body) = app.post(&uri, Some(MEMBER), json!({})).await;
    let booking_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .delete(&format!("/orders/{}", booking_id), Some(MEMBER))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post(&uri, Some(MEMBER), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_join_conflicts_with_live_paid_booking() {
    let app = setup_people().await;
    let club_id = app.create_club(MANAGER, "Chess Club", 10.0).await;
    app.insert_booking(&club_id, MEMBER, MANAGER, BookingStatus::Confirmed, 10.0)
        .await;

    let (status, _) = app
        .patch(&format!("/clubs/{}", club_id), Some(MANAGER), json!({"price": 0}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(&format!("/clubs/{}/join", club_id), Some(MEMBER), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let live = app
        .count("SELECT COUNT(*) FROM bookings WHERE status <> 'cancelled'")
        .await;
    assert_eq!(live, 1);
}

#[tokio::test]
async fn test_join_paid_club_is_rejected() {
    let app = setup_people().await;
    let club_id = app.create_club(MANAGER, "Chess Club", 30.0).await;

    let (status, body) = app
        .post(&format!("/clubs/{}/join", club_id), Some(MEMBER), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = app
        .post("/clubs/missing/join", Some(MEMBER), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_club_blocked_by_live_booking() {
    let app = setup_people().await;
    let club_id = app.create_club(MANAGER, "Chess Club", 30.0).await;
    let booking = app
        .insert_booking(&club_id, MEMBER, MANAGER, BookingStatus::Processing, 30.0)
        .await;
    let uri = format!("/clubs/{}", club_id);

    let (status, body) = app.delete(&uri, Some(MANAGER)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = app
        .delete(&format!("/orders/{}", booking.id), Some(MEMBER))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.delete(&uri, Some(OTHER_MANAGER)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(MANAGER)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_club_allowed_after_completion() {
    let app = setup_people().await;
    let club_id = app.create_club(MANAGER, "Chess Club", 30.0).await;
    app.insert_booking(&club_id, MEMBER, MANAGER, BookingStatus::Completed, 30.0)
        .await;

    let (status, _) = app.delete(&format!("/clubs/{}", club_id), Some(ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
}
