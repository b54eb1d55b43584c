//! Orders (bookings) for customers and the managers selling to them.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::db::{
    Booking, BookingResponse, BookingStatus, Club, OrderQuery, TransitionError,
    UpdateBookingStatusRequest,
};
use crate::identity::Principal;
use crate::AppState;

use super::auth::Manager;
use super::error::ApiError;

async fn load_booking(pool: &sqlx::SqlitePool, id: &str) -> Result<Booking, ApiError> {
    Booking::find(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))
}

/// Apply `from -> to` only if nobody changed the order in between
async fn save_status(
    pool: &sqlx::SqlitePool,
    id: &str,
    from: BookingStatus,
    to: BookingStatus,
) -> Result<BookingResponse, ApiError> {
    if !Booking::set_status(pool, id, from, to).await? {
        tracing::warn!(booking_id = %id, expected = %from, "Order status changed concurrently");
        return Err(TransitionError::Stale(from).into());
    }
    Ok(load_booking(pool, id).await?.into())
}

fn parse_status(value: &str) -> Result<BookingStatus, ApiError> {
    value.parse::<BookingStatus>().map_err(|_| {
        ApiError::validation_field(
            "status",
            "Invalid status. Must be one of: confirmed, processing, completed, cancelled",
        )
    })
}

/// Bookings bought by the caller
pub async fn my_orders(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let bookings = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE customer_email = ? ORDER BY created_at DESC",
    )
    .bind(&principal.email)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

/// Bookings sold by the calling manager
pub async fn manage_orders(
    State(state): State<Arc<AppState>>,
    Manager(principal): Manager,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let bookings = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(status) => {
            let status = parse_status(status)?;
            sqlx::query_as::<_, Booking>(
                "SELECT * FROM bookings WHERE seller_email = ? AND status = ? ORDER BY created_at DESC",
            )
            .bind(&principal.email)
            .bind(status.as_str())
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Booking>(
                "SELECT * FROM bookings WHERE seller_email = ? ORDER BY created_at DESC",
            )
            .bind(&principal.email)
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

/// Cancel an order as its customer or seller
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = load_booking(&state.db, &id).await?;

    if booking.customer_email != principal.email && booking.seller_email != principal.email {
        return Err(ApiError::forbidden("You can only cancel your own orders"));
    }

    let current = booking.status_enum();
    let next = current.cancel()?;
    let updated = save_status(&state.db, &id, current, next).await?;

    tracing::info!(booking_id = %id, by = %principal.email, "Order cancelled");

    Ok(Json(updated))
}

/// Set an order's status as its seller
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Manager(principal): Manager,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let target = parse_status(&req.status)?;
    let booking = load_booking(&state.db, &id).await?;

    if booking.seller_email != principal.email {
        return Err(ApiError::forbidden("You can only update orders for your clubs"));
    }

    let current = booking.status_enum();
    let next = current.update_to(target)?;
    if next == current {
        return Ok(Json(booking.into()));
    }

    let updated = save_status(&state.db, &id, current, next).await?;
    tracing::info!(booking_id = %id, from = %current, to = %next, "Order status updated");

    Ok(Json(updated))
}

async fn adjudicate(
    state: &AppState,
    id: &str,
    principal: &Principal,
    approve: bool,
) -> Result<BookingResponse, ApiError> {
    let booking = load_booking(&state.db, id).await?;

    let owner = match Club::find(&state.db, &booking.club_id).await? {
        Some(club) => club.seller_email,
        None => booking.seller_email.clone(),
    };
    if owner != principal.email {
        return Err(ApiError::forbidden("You do not own the club for this order"));
    }

    let current = booking.status_enum();
    let next = current.adjudicate(approve)?;
    let updated = save_status(&state.db, id, current, next).await?;

    tracing::info!(booking_id = %id, approved = approve, by = %principal.email, "Pending order decided");

    Ok(updated)
}

/// Approve a pending order
pub async fn approve_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Manager(principal): Manager,
) -> Result<Json<BookingResponse>, ApiError> {
    Ok(Json(adjudicate(&state, &id, &principal, true).await?))
}

/// Reject a pending order
pub async fn reject_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Manager(principal): Manager,
) -> Result<Json<BookingResponse>, ApiError> {
    Ok(Json(adjudicate(&state, &id, &principal, false).await?))
}
