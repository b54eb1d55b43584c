//! Manager dashboard endpoints.

use axum::{extract::State, Json};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::db::{
    now_timestamp, Booking, BookingResponse, BookingStatus, Club, ClubResponse, Event,
    EventDetail, EventRegistration, ManagedClub, RegistrationWithEvent,
};
use crate::reporting::{self, ManagerStatistics};
use crate::AppState;

use super::auth::Manager;
use super::error::ApiError;

async fn registrations_for_manager(
    pool: &sqlx::SqlitePool,
    email: &str,
) -> Result<Vec<EventRegistration>, sqlx::Error> {
    sqlx::query_as::<_, EventRegistration>(
        r#"
        SELECT r.* FROM event_registrations r
        INNER JOIN events e ON e.id = r.event_id
        WHERE e.manager_email = ?
        "#,
    )
    .bind(email)
    .fetch_all(pool)
    .await
}

/// Dashboard figures across the caller's clubs and events
pub async fn statistics(
    State(state): State<Arc<AppState>>,
    Manager(principal): Manager,
) -> Result<Json<ManagerStatistics>, ApiError> {
    let clubs = Club::owned_by(&state.db, &principal.email).await?;
    let bookings = Booking::for_clubs_owned_by(&state.db, &principal.email).await?;
    let events = Event::managed_by(&state.db, &principal.email).await?;
    let registrations = registrations_for_manager(&state.db, &principal.email).await?;

    tracing::debug!(
        email = %principal.email,
        clubs = clubs.len(),
        bookings = bookings.len(),
        events = events.len(),
        "Computing manager statistics"
    );

    Ok(Json(reporting::compute(
        &clubs,
        &bookings,
        &events,
        &registrations,
        Utc::now(),
    )))
}

/// Owned clubs with member and active booking counts
pub async fn clubs(
    State(state): State<Arc<AppState>>,
    Manager(principal): Manager,
) -> Result<Json<Vec<ManagedClub>>, ApiError> {
    let clubs = Club::owned_by(&state.db, &principal.email).await?;
    let bookings = Booking::for_clubs_owned_by(&state.db, &principal.email).await?;

    let mut members: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut active: HashMap<&str, usize> = HashMap::new();
    for booking in &bookings {
        let status = booking.status_enum();
        if status != BookingStatus::Cancelled {
            members
                .entry(booking.club_id.as_str())
                .or_default()
                .insert(booking.customer_email.as_str());
        }
        if !status.is_terminal() {
            *active.entry(booking.club_id.as_str()).or_default() += 1;
        }
    }

    let managed = clubs
        .into_iter()
        .map(|club| {
            let member_count = members.get(club.id.as_str()).map_or(0, |m| m.len());
            let active_bookings = active.get(club.id.as_str()).copied().unwrap_or(0);
            ManagedClub {
                club: ClubResponse::from(club),
                member_count,
                active_bookings,
            }
        })
        .collect();

    Ok(Json(managed))
}

/// Owned events that have not started, soonest first
pub async fn upcoming_events(
    State(state): State<Arc<AppState>>,
    Manager(principal): Manager,
) -> Result<Json<Vec<EventDetail>>, ApiError> {
    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE manager_email = ? AND event_date > ? ORDER BY event_date ASC",
    )
    .bind(&principal.email)
    .bind(now_timestamp())
    .fetch_all(&state.db)
    .await?;

    let mut details = Vec::with_capacity(events.len());
    for event in events {
        let count = Event::active_registrations(&state.db, &event.id).await?;
        details.push(EventDetail::new(event, count));
    }

    Ok(Json(details))
}

/// Processing bookings on owned clubs, oldest first
pub async fn pending_requests(
    State(state): State<Arc<AppState>>,
    Manager(principal): Manager,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let mut pending: Vec<Booking> = Booking::for_clubs_owned_by(&state.db, &principal.email)
        .await?
        .into_iter()
        .filter(|b| b.status_enum() == BookingStatus::Processing)
        .collect();
    pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    Ok(Json(pending.into_iter().map(BookingResponse::from).collect()))
}

/// Every registration across owned events, newest first
pub async fn all_registrations(
    State(state): State<Arc<AppState>>,
    Manager(principal): Manager,
) -> Result<Json<Vec<RegistrationWithEvent>>, ApiError> {
    let registrations = sqlx::query_as::<_, RegistrationWithEvent>(
        r#"
        SELECT r.id, r.event_id, r.user_email, r.user_name, r.status, r.registered_at,
               e.title AS event_title, e.event_date, e.club_id
        FROM event_registrations r
        INNER JOIN events e ON e.id = r.event_id
        WHERE e.manager_email = ?
        ORDER BY r.registered_at DESC
        "#,
    )
    .bind(&principal.email)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(registrations))
}
