//! Club events and registrations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::{
    now_timestamp, parse_timestamp, AdjudicateRegistrationRequest, CreateEventRequest, Event,
    EventDetail, EventQuery, EventRegistration, EventSort, MessageResponse, RegistrationStatus,
    RegistrationWithEvent, UpdateEventRequest,
};
use crate::identity::Principal;
use crate::AppState;

use super::auth::Manager;
use super::clubs::{load_club, party_for};
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_description, validate_event_date, validate_event_fee, validate_event_title,
    validate_max_attendees,
};

async fn load_event(pool: &sqlx::SqlitePool, id: &str) -> Result<Event, ApiError> {
    Event::find(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))
}

/// Load an event the principal manages, `NotFound` before `Forbidden`
async fn load_owned_event(
    pool: &sqlx::SqlitePool,
    id: &str,
    principal: &Principal,
) -> Result<Event, ApiError> {
    let event = load_event(pool, id).await?;
    if event.manager_email != principal.email {
        tracing::warn!(event_id = %id, email = %principal.email, "Event ownership check failed");
        return Err(ApiError::forbidden("You do not manage this event"));
    }
    Ok(event)
}

/// Active registration counts keyed by event id
async fn active_counts(pool: &sqlx::SqlitePool) -> Result<HashMap<String, i64>, ApiError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT event_id, COUNT(*) FROM event_registrations
        WHERE status IN ('registered', 'confirmed')
        GROUP BY event_id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Create an event for one of the caller's clubs
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Manager(principal): Manager,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventDetail>), ApiError> {
    let event_fee = req.event_fee.unwrap_or(0.0);
    let is_paid = req.is_paid.unwrap_or(event_fee > 0.0);

    let mut errors = ValidationErrorBuilder::new();
    if req.club_id.trim().is_empty() {
        errors.add("clubId", "Club id is required");
    }
    errors.check("title", validate_event_title(&req.title));
    errors.check("description", validate_description(&req.description));
    let event_date = match validate_event_date(&req.event_date) {
        Ok(date) => Some(date),
        Err(e) => {
            errors.add("eventDate", e);
            None
        }
    };
    errors.check("eventFee", validate_event_fee(is_paid, event_fee));
    if let Some(max) = req.max_attendees {
        errors.check("maxAttendees", validate_max_attendees(max));
    }
    errors.finish()?;
    let event_date = event_date.unwrap_or_default();

    let club = load_club(&state.db, req.club_id.trim()).await?;
    if club.seller_email != principal.email {
        return Err(ApiError::forbidden("You can only create events for your own clubs"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO events (
            id, club_id, title, description, event_date, location,
            is_paid, event_fee, max_attendees, manager_email, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&club.id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(&event_date)
    .bind(&req.location)
    .bind(is_paid)
    .bind(event_fee)
    .bind(req.max_attendees)
    .bind(&principal.email)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let event = load_event(&state.db, &id).await?;
    tracing::info!(event_id = %id, club_id = %club.id, "Event created");

    Ok((StatusCode::CREATED, Json(EventDetail::new(event, 0))))
}

/// List events
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<EventDetail>>, ApiError> {
    let sort = match query.sort.as_deref().filter(|s| !s.is_empty()) {
        Some(sort) => sort
            .parse::<EventSort>()
            .map_err(|e| ApiError::validation_field("sort", e))?,
        None => EventSort::default(),
    };

    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(club_id) = query.club_id.as_ref().filter(|c| !c.is_empty()) {
        conditions.push("club_id = ?");
        bindings.push(club_id.clone());
    }

    if query.upcoming.unwrap_or(false) {
        conditions.push("event_date > ?");
        bindings.push(now_timestamp());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!("SELECT * FROM events {} ORDER BY {}", where_clause, sort.order_by());
    let mut query_builder = sqlx::query_as::<_, Event>(&sql);
    for binding in &bindings {
        query_builder = query_builder.bind(binding);
    }
    let events = query_builder.fetch_all(&state.db).await?;

    let counts = active_counts(&state.db).await?;
    let details = events
        .into_iter()
        .map(|event| {
            let count = counts.get(&event.id).copied().unwrap_or(0);
            EventDetail::new(event, count)
        })
        .collect();

    Ok(Json(details))
}

/// Get a single event
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EventDetail>, ApiError> {
    let event = load_event(&state.db, &id).await?;
    let count = Event::active_registrations(&state.db, &id).await?;
    Ok(Json(EventDetail::new(event, count)))
}

/// Partially update an event
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<EventDetail>, ApiError> {
    let event = load_owned_event(&state.db, &id, &principal).await?;

    if req.title.is_none()
        && req.description.is_none()
        && req.event_date.is_none()
        && req.location.is_none()
        && req.is_paid.is_none()
        && req.event_fee.is_none()
        && req.max_attendees.is_none()
    {
        return Err(ApiError::bad_request("No changes"));
    }

    // Turning an event free without a fee clears the stored fee
    let event_fee = match (req.event_fee, req.is_paid) {
        (Some(fee), _) => fee,
        (None, Some(false)) => 0.0,
        (None, _) => event.event_fee,
    };
    let is_paid = req
        .is_paid
        .or(req.event_fee.map(|fee| fee > 0.0))
        .unwrap_or(event.is_paid);

    let mut errors = ValidationErrorBuilder::new();
    if let Some(ref title) = req.title {
        errors.check("title", validate_event_title(title));
    }
    if let Some(ref description) = req.description {
        errors.check("description", validate_description(description));
    }
    let event_date = match req.event_date.as_deref() {
        Some(date) => match validate_event_date(date) {
            Ok(date) => Some(date),
            Err(e) => {
                errors.add("eventDate", e);
                None
            }
        },
        None => None,
    };
    errors.check("eventFee", validate_event_fee(is_paid, event_fee));
    if let Some(max) = req.max_attendees {
        errors.check("maxAttendees", validate_max_attendees(max));
    }
    errors.finish()?;

    sqlx::query(
        r#"
        UPDATE events SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            event_date = COALESCE(?, event_date),
            location = COALESCE(?, location),
            is_paid = ?,
            event_fee = ?,
            max_attendees = COALESCE(?, max_attendees),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.title.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(&event_date)
    .bind(&req.location)
    .bind(is_paid)
    .bind(event_fee)
    .bind(req.max_attendees)
    .bind(now_timestamp())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let event = load_event(&state.db, &id).await?;
    let count = Event::active_registrations(&state.db, &id).await?;
    tracing::info!(event_id = %id, "Event updated");

    Ok(Json(EventDetail::new(event, count)))
}

/// Delete an event nobody has registered for
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<MessageResponse>, ApiError> {
    load_owned_event(&state.db, &id, &principal).await?;

    let registrations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM event_registrations WHERE event_id = ?")
            .bind(&id)
            .fetch_one(&state.db)
            .await?;

    if registrations > 0 {
        return Err(ApiError::bad_request(format!(
            "Cannot delete event with {} registration(s)",
            registrations
        )));
    }

    sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    tracing::info!(event_id = %id, by = %principal.email, "Event deleted");

    Ok(Json(MessageResponse::ok("Event deleted")))
}

/// Register the caller for an event
pub async fn register(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<(StatusCode, Json<EventRegistration>), ApiError> {
    let event = load_event(&state.db, &id).await?;

    let starts = parse_timestamp(&event.event_date)
        .ok_or_else(|| ApiError::internal("Stored event date is unreadable"))?;
    if starts <= Utc::now() {
        return Err(ApiError::validation_field(
            "eventDate",
            "This event has already taken place",
        ));
    }

    let existing = EventRegistration::find(&state.db, &id, &principal.email).await?;
    match existing.as_ref().map(|r| r.status_enum()) {
        Some(status) if status.is_active() => {
            return Err(ApiError::conflict("You are already registered for this event"));
        }
        Some(RegistrationStatus::Rejected) => {
            return Err(ApiError::conflict("Your registration for this event was rejected"));
        }
        _ => {}
    }

    if let Some(max) = event.max_attendees {
        let active = Event::active_registrations(&state.db, &id).await?;
        if active >= max {
            return Err(ApiError::conflict("This event is full"));
        }
    }

    let user_name = party_for(&state.db, &principal).await?.name;
    let now = now_timestamp();

    match existing {
        Some(previous) => {
            sqlx::query(
                "UPDATE event_registrations SET status = ?, user_name = COALESCE(?, user_name), registered_at = ?, updated_at = ? WHERE id = ?",
            )
            .bind(RegistrationStatus::Registered.as_str())
            .bind(&user_name)
            .bind(&now)
            .bind(&now)
            .bind(&previous.id)
            .execute(&state.db)
            .await?;
            tracing::info!(event_id = %id, email = %principal.email, "Registration reactivated");
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO event_registrations (
                    id, event_id, user_email, user_name, status, registered_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&id)
            .bind(&principal.email)
            .bind(&user_name)
            .bind(RegistrationStatus::Registered.as_str())
            .bind(&now)
            .bind(&now)
            .execute(&state.db)
            .await?;
            tracing::info!(event_id = %id, email = %principal.email, "Registered for event");
        }
    }

    let registration = EventRegistration::find(&state.db, &id, &principal.email)
        .await?
        .ok_or_else(|| ApiError::internal("Registration vanished after write"))?;

    Ok((StatusCode::CREATED, Json(registration)))
}

/// Cancel the caller's active registration
pub async fn cancel_registration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<EventRegistration>, ApiError> {
    let registration = EventRegistration::find(&state.db, &id, &principal.email)
        .await?
        .filter(|r| r.status_enum().is_active())
        .ok_or_else(|| ApiError::not_found("No active registration for this event"))?;

    sqlx::query("UPDATE event_registrations SET status = ?, updated_at = ? WHERE id = ?")
        .bind(RegistrationStatus::Cancelled.as_str())
        .bind(now_timestamp())
        .bind(&registration.id)
        .execute(&state.db)
        .await?;

    tracing::info!(event_id = %id, email = %principal.email, "Registration cancelled");

    let registration = EventRegistration::find(&state.db, &id, &principal.email)
        .await?
        .ok_or_else(|| ApiError::not_found("Registration not found"))?;
    Ok(Json(registration))
}

/// Registrations for one of the caller's events
pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<Vec<EventRegistration>>, ApiError> {
    load_owned_event(&state.db, &id, &principal).await?;

    let registrations = sqlx::query_as::<_, EventRegistration>(
        "SELECT * FROM event_registrations WHERE event_id = ? ORDER BY registered_at ASC",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(registrations))
}

/// Confirm or reject a pending registration
pub async fn adjudicate_registration(
    State(state): State<Arc<AppState>>,
    Path((id, registration_id)): Path<(String, String)>,
    principal: Principal,
    Json(req): Json<AdjudicateRegistrationRequest>,
) -> Result<Json<EventRegistration>, ApiError> {
    let target = match req.status.parse::<RegistrationStatus>() {
        Ok(status @ (RegistrationStatus::Confirmed | RegistrationStatus::Rejected)) => status,
        _ => {
            return Err(ApiError::validation_field(
                "status",
                "Invalid status. Must be one of: confirmed, rejected",
            ));
        }
    };

    load_owned_event(&state.db, &id, &principal).await?;

    let registration = sqlx::query_as::<_, EventRegistration>(
        "SELECT * FROM event_registrations WHERE id = ? AND event_id = ?",
    )
    .bind(&registration_id)
    .bind(&id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Registration not found"))?;

    let current = registration.status_enum();
    if current != RegistrationStatus::Registered {
        return Err(ApiError::invalid_transition(format!(
            "Cannot change a {} registration to {}",
            current, target
        )));
    }

    sqlx::query("UPDATE event_registrations SET status = ?, updated_at = ? WHERE id = ?")
        .bind(target.as_str())
        .bind(now_timestamp())
        .bind(&registration_id)
        .execute(&state.db)
        .await?;

    tracing::info!(
        event_id = %id,
        registration_id = %registration_id,
        status = %target,
        "Registration decided"
    );

    let registration = sqlx::query_as::<_, EventRegistration>(
        "SELECT * FROM event_registrations WHERE id = ?",
    )
    .bind(&registration_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(registration))
}

/// The caller's registrations with their events
pub async fn my_registrations(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<RegistrationWithEvent>>, ApiError> {
    let registrations = sqlx::query_as::<_, RegistrationWithEvent>(
        r#"
        SELECT r.id, r.event_id, r.user_email, r.user_name, r.status, r.registered_at,
               e.title AS event_title, e.event_date, e.club_id
        FROM event_registrations r
        INNER JOIN events e ON e.id = r.event_id
        WHERE r.user_email = ?
        ORDER BY r.registered_at DESC
        "#,
    )
    .bind(&principal.email)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(registrations))
}
