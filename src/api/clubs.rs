//! Club listing, management and free membership.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{
    now_timestamp, BookingResponse, BookingStatus, Club, ClubQuery, ClubResponse, ClubStatus,
    CreateClubRequest, MessageResponse, NewBooking, Party, Role, UpdateClubRequest,
    UpdateClubStatusRequest, User,
};
use crate::identity::Principal;
use crate::AppState;

use super::auth::{Admin, Manager};
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_category, validate_club_name, validate_description, validate_image_url,
    validate_price,
};

/// Load a club or fail with `NotFound`
pub(crate) async fn load_club(pool: &sqlx::SqlitePool, id: &str) -> Result<Club, ApiError> {
    Club::find(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Club not found"))
}

/// Profile of the principal as stored at login, falling back to token claims
pub(crate) async fn party_for(
    pool: &sqlx::SqlitePool,
    principal: &Principal,
) -> Result<Party, ApiError> {
    let user = User::find(pool, &principal.email).await?;
    Ok(Party {
        email: principal.email.clone(),
        name: user
            .as_ref()
            .and_then(|u| u.name.clone())
            .or_else(|| principal.name.clone()),
        image: user.and_then(|u| u.image),
    })
}

/// The owning manager or any admin may change a club
async fn require_owner_or_admin(
    pool: &sqlx::SqlitePool,
    principal: &Principal,
    club: &Club,
) -> Result<(), ApiError> {
    let role = User::role_of(pool, &principal.email).await?;
    match role {
        Some(Role::Admin) => Ok(()),
        Some(Role::Manager) if club.seller_email == principal.email => Ok(()),
        Some(Role::Manager) => Err(ApiError::forbidden("You do not own this club")),
        other => Err(ApiError::role_mismatch(Role::Manager, other)),
    }
}

fn validate_create_request(req: &CreateClubRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    errors.check("name", validate_club_name(&req.name));
    errors.check("category", validate_category(&req.category));
    errors.check("description", validate_description(&req.description));
    errors.check("price", validate_price(req.price));
    if let Some(ref image) = req.image {
        errors.check("image", validate_image_url(image));
    }

    errors.finish()
}

fn validate_update_request(req: &UpdateClubRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(ref name) = req.name {
        errors.check("name", validate_club_name(name));
    }
    if let Some(ref category) = req.category {
        errors.check("category", validate_category(category));
    }
    if let Some(ref description) = req.description {
        errors.check("description", validate_description(description));
    }
    if let Some(price) = req.price {
        errors.check("price", validate_price(price));
    }
    if let Some(ref image) = req.image {
        errors.check("image", validate_image_url(image));
    }

    errors.finish()
}

/// List clubs, newest first
pub async fn list_clubs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClubQuery>,
) -> Result<Json<Vec<ClubResponse>>, ApiError> {
    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        conditions.push("category = ?");
        bindings.push(category.clone());
    }

    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status = status
            .parse::<ClubStatus>()
            .map_err(|e| ApiError::validation_field("status", e))?;
        conditions.push("status = ?");
        bindings.push(status.to_string());
    }

    if let Some(search) = query.search.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        conditions.push("name LIKE ?");
        bindings.push(format!("%{}%", search));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT * FROM clubs {} ORDER BY created_at DESC",
        where_clause
    );
    let mut query_builder = sqlx::query_as::<_, Club>(&sql);
    for binding in &bindings {
        query_builder = query_builder.bind(binding);
    }

    let clubs = query_builder.fetch_all(&state.db).await?;
    Ok(Json(clubs.into_iter().map(ClubResponse::from).collect()))
}

/// Get a single club
pub async fn get_club(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ClubResponse>, ApiError> {
    let club = load_club(&state.db, &id).await?;
    Ok(Json(club.into()))
}

/// Create a club owned by the calling manager. New clubs await admin approval.
pub async fn create_club(
    State(state): State<Arc<AppState>>,
    Manager(principal): Manager,
    Json(req): Json<CreateClubRequest>,
) -> Result<(StatusCode, Json<ClubResponse>), ApiError> {
    validate_create_request(&req)?;

    let seller = party_for(&state.db, &principal).await?;
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO clubs (
            id, name, description, category, location, price, image,
            seller_email, seller_name, seller_image, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(req.category.trim())
    .bind(&req.location)
    .bind(req.price)
    .bind(&req.image)
    .bind(&seller.email)
    .bind(&seller.name)
    .bind(&seller.image)
    .bind(ClubStatus::Pending.to_string())
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let club = load_club(&state.db, &id).await?;
    tracing::info!(club_id = %club.id, seller = %seller.email, "Club created");

    Ok((StatusCode::CREATED, Json(club.into())))
}

/// Partially update a club
pub async fn update_club(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
    Json(req): Json<UpdateClubRequest>,
) -> Result<Json<ClubResponse>, ApiError> {
    let club = load_club(&state.db, &id).await?;
    require_owner_or_admin(&state.db, &principal, &club).await?;

    if req.is_empty() {
        return Err(ApiError::bad_request("No changes"));
    }
    validate_update_request(&req)?;

    sqlx::query(
        r#"
        UPDATE clubs SET
            name = COALESCE(?, name),
            description = COALESCE(?, description),
            category = COALESCE(?, category),
            location = COALESCE(?, location),
            price = COALESCE(?, price),
            image = COALESCE(?, image),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(req.category.as_deref().map(str::trim))
    .bind(&req.location)
    .bind(req.price)
    .bind(&req.image)
    .bind(now_timestamp())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let club = load_club(&state.db, &id).await?;
    tracing::info!(club_id = %id, by = %principal.email, "Club updated");

    Ok(Json(club.into()))
}

/// Approve, reject or re-open a club
pub async fn update_club_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Admin(admin): Admin,
    Json(req): Json<UpdateClubStatusRequest>,
) -> Result<Json<ClubResponse>, ApiError> {
    let status = req
        .status
        .parse::<ClubStatus>()
        .map_err(|_| {
            ApiError::validation_field(
                "status",
                "Invalid status. Must be one of: pending, approved, rejected",
            )
        })?;

    let result = sqlx::query("UPDATE clubs SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.to_string())
        .bind(now_timestamp())
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Club not found"));
    }

    tracing::info!(club_id = %id, status = %status, by = %admin.email, "Club status changed");

    let club = load_club(&state.db, &id).await?;
    Ok(Json(club.into()))
}

/// Delete a club that has no live bookings
pub async fn delete_club(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<MessageResponse>, ApiError> {
    let club = load_club(&state.db, &id).await?;
    require_owner_or_admin(&state.db, &principal, &club).await?;

    let live: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM bookings WHERE club_id = ? AND status IN ('confirmed', 'processing')",
    )
    .bind(&id)
    .fetch_one(&state.db)
    .await?;

    if live > 0 {
        return Err(ApiError::bad_request(format!(
            "Cannot delete club with {} active booking(s)",
            live
        )));
    }

    sqlx::query("DELETE FROM clubs WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    tracing::info!(club_id = %id, by = %principal.email, "Club deleted");

    Ok(Json(MessageResponse::ok("Club deleted")))
}

/// Join a free club
pub async fn join_club(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let club = load_club(&state.db, &id).await?;

    if !club.is_free() {
        return Err(ApiError::validation_field(
            "price",
            "This club requires payment. Use checkout instead",
        ));
    }

    let existing: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM bookings
        WHERE club_id = ? AND customer_email = ? AND status <> 'cancelled'
        "#,
    )
    .bind(&club.id)
    .bind(&principal.email)
    .fetch_one(&state.db)
    .await?;

    if existing > 0 {
        return Err(ApiError::conflict("You are already a member of this club"));
    }

    let customer = party_for(&state.db, &principal).await?;
    let booking = NewBooking {
        session_id: None,
        club_id: club.id.clone(),
        transaction_id: None,
        customer,
        seller: club.seller(),
        club_name: club.name.clone(),
        category: Some(club.category.clone()),
        image: club.image.clone(),
        status: BookingStatus::Confirmed,
        price: 0.0,
        quantity: 1,
    }
    .insert(&state.db)
    .await
    .map_err(|e| match ApiError::from(e) {
        err if err.status() == StatusCode::CONFLICT => {
            ApiError::conflict("You are already a member of this club")
        }
        err => err,
    })?;

    tracing::info!(
        booking_id = %booking.id,
        club_id = %club.id,
        customer = %principal.email,
        "Free membership created"
    );

    Ok((StatusCode::CREATED, Json(booking.into())))
}
