//! Saved clubs and events.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{
    now_timestamp, Bookmark, BookmarkKind, BookmarkQuery, Club, Event, MessageResponse,
};
use crate::identity::Principal;
use crate::AppState;

use super::error::ApiError;

async fn target_exists(
    pool: &sqlx::SqlitePool,
    kind: BookmarkKind,
    id: &str,
) -> Result<bool, ApiError> {
    Ok(match kind {
        BookmarkKind::Club => Club::find(pool, id).await?.is_some(),
        BookmarkKind::Event => Event::find(pool, id).await?.is_some(),
    })
}

async fn add(
    state: &AppState,
    principal: &Principal,
    kind: BookmarkKind,
    target_id: &str,
) -> Result<Bookmark, ApiError> {
    if !target_exists(&state.db, kind, target_id).await? {
        return Err(ApiError::not_found(match kind {
            BookmarkKind::Club => "Club not found",
            BookmarkKind::Event => "Event not found",
        }));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let result = sqlx::query(
        r#"
        INSERT INTO bookmarks (id, user_email, target_id, kind, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_email, target_id, kind) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(&principal.email)
    .bind(target_id)
    .bind(kind.as_str())
    .bind(now_timestamp())
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict("Already bookmarked"));
    }

    let bookmark = sqlx::query_as::<_, Bookmark>("SELECT * FROM bookmarks WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    tracing::debug!(email = %principal.email, target_id = %target_id, kind = kind.as_str(), "Bookmark added");
    Ok(bookmark)
}

async fn remove(
    state: &AppState,
    principal: &Principal,
    kind: BookmarkKind,
    target_id: &str,
) -> Result<MessageResponse, ApiError> {
    let result = sqlx::query(
        "DELETE FROM bookmarks WHERE user_email = ? AND target_id = ? AND kind = ?",
    )
    .bind(&principal.email)
    .bind(target_id)
    .bind(kind.as_str())
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Bookmark not found"));
    }

    Ok(MessageResponse::ok("Bookmark removed"))
}

pub async fn bookmark_club(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<(StatusCode, Json<Bookmark>), ApiError> {
    let bookmark = add(&state, &principal, BookmarkKind::Club, &id).await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

pub async fn unbookmark_club(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<MessageResponse>, ApiError> {
    Ok(Json(remove(&state, &principal, BookmarkKind::Club, &id).await?))
}

pub async fn bookmark_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<(StatusCode, Json<Bookmark>), ApiError> {
    let bookmark = add(&state, &principal, BookmarkKind::Event, &id).await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

pub async fn unbookmark_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<MessageResponse>, ApiError> {
    Ok(Json(remove(&state, &principal, BookmarkKind::Event, &id).await?))
}

/// The caller's bookmarks, newest first, optionally of one type
pub async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<BookmarkQuery>,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    let bookmarks = match query.kind.as_deref().filter(|k| !k.is_empty()) {
        Some(kind) => {
            let kind = kind
                .parse::<BookmarkKind>()
                .map_err(|e| ApiError::validation_field("type", e))?;
            sqlx::query_as::<_, Bookmark>(
                "SELECT * FROM bookmarks WHERE user_email = ? AND kind = ? ORDER BY created_at DESC",
            )
            .bind(&principal.email)
            .bind(kind.as_str())
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Bookmark>(
                "SELECT * FROM bookmarks WHERE user_email = ? ORDER BY created_at DESC",
            )
            .bind(&principal.email)
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(Json(bookmarks))
}
