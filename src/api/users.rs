//! User login records, roles and manager upgrade requests.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::{
    now_timestamp, ManagerRequest, ManagerRequestWithUser, MessageResponse, Role, RoleResponse,
    UpdateRoleRequest, UpsertUserRequest, UpsertUserResponse, User,
};
use crate::identity::Principal;
use crate::AppState;

use super::auth::Admin;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_image_url, validate_role};

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Record a login. The first call for an email creates a `member`.
pub async fn upsert_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpsertUserRequest>,
) -> Result<(StatusCode, Json<UpsertUserResponse>), ApiError> {
    let email = req.email.trim().to_lowercase();
    let name = non_empty(req.name);
    let image = non_empty(req.image);

    let mut errors = ValidationErrorBuilder::new();
    errors.check("email", validate_email(&email));
    if let Some(ref image) = image {
        errors.check("image", validate_image_url(image));
    }
    errors.finish()?;

    let existed = User::find(&state.db, &email).await?.is_some();
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO users (email, name, image, role, created_at, last_logged_in)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(email) DO UPDATE SET
            name = COALESCE(excluded.name, users.name),
            image = COALESCE(excluded.image, users.image),
            last_logged_in = excluded.last_logged_in
        "#,
    )
    .bind(&email)
    .bind(&name)
    .bind(&image)
    .bind(Role::Member.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let user = User::find(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::internal("User vanished after upsert"))?;

    let status = if existed {
        tracing::debug!(email = %email, "User logged in");
        StatusCode::OK
    } else {
        tracing::info!(email = %email, "New user registered");
        StatusCode::CREATED
    };

    Ok((
        status,
        Json(UpsertUserResponse {
            inserted: !existed,
            user,
        }),
    ))
}

/// Stored role of the caller, `null` if they never logged in
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<RoleResponse>, ApiError> {
    let role = User::role_of(&state.db, &principal.email).await?;
    Ok(Json(RoleResponse {
        role: role.map(|r| r.to_string()),
    }))
}

/// File a request to become a manager
pub async fn become_manager(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<(StatusCode, Json<ManagerRequest>), ApiError> {
    let user = User::find(&state.db, &principal.email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    match user.role_enum() {
        Role::Manager | Role::Admin => {
            return Err(ApiError::conflict(format!(
                "You already have the {} role",
                user.role_enum()
            )));
        }
        Role::Member => {}
    }

    let now = now_timestamp();
    let result = sqlx::query(
        "INSERT INTO manager_requests (email, created_at) VALUES (?, ?) ON CONFLICT(email) DO NOTHING",
    )
    .bind(&principal.email)
    .bind(&now)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict("A manager request is already pending"));
    }

    tracing::info!(email = %principal.email, "Manager request filed");

    Ok((
        StatusCode::CREATED,
        Json(ManagerRequest {
            email: principal.email,
            created_at: now,
        }),
    ))
}

/// Pending manager requests with the requesting users' profiles
pub async fn list_manager_requests(
    State(state): State<Arc<AppState>>,
    _admin: Admin,
) -> Result<Json<Vec<ManagerRequestWithUser>>, ApiError> {
    let requests = sqlx::query_as::<_, ManagerRequestWithUser>(
        r#"
        SELECT r.email, r.created_at, u.name, u.image, u.role
        FROM manager_requests r
        LEFT JOIN users u ON u.email = r.email
        ORDER BY r.created_at ASC
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(requests))
}

/// Assign a role and clear the user's pending request
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Admin(admin): Admin,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();

    let mut errors = ValidationErrorBuilder::new();
    errors.check("email", validate_email(&email));
    let role = match validate_role(&req.role) {
        Ok(role) => Some(role),
        Err(e) => {
            errors.add("role", e);
            None
        }
    };
    errors.finish()?;
    let role = role.unwrap_or(Role::Member);

    let mut tx = state.db.begin().await?;

    let result = sqlx::query("UPDATE users SET role = ? WHERE email = ?")
        .bind(role.as_str())
        .bind(&email)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    sqlx::query("DELETE FROM manager_requests WHERE email = ?")
        .bind(&email)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(email = %email, role = %role, by = %admin.email, "Role updated");

    Ok(Json(MessageResponse::ok(format!(
        "{} is now {}",
        email, role
    ))))
}

/// Every user, newest first
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: Admin,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(users))
}
