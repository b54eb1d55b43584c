//! Request authentication and role guards.
//!
//! `Principal` is extracted from the bearer token on every protected route.
//! `Manager` and `Admin` additionally require the stored role to match.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use crate::db::{Role, User};
use crate::identity::{bearer_token, Principal};
use crate::AppState;

use super::error::ApiError;

/// Principal whose stored role is `manager`
#[derive(Debug, Clone)]
pub struct Manager(pub Principal);

/// Principal whose stored role is `admin`
#[derive(Debug, Clone)]
pub struct Admin(pub Principal);

fn principal_from_parts(parts: &Parts, state: &AppState) -> Result<Principal, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthenticated("Unauthorized Access!"))?;

    let token = bearer_token(header).ok_or_else(|| {
        tracing::warn!("Malformed Authorization header");
        ApiError::unauthenticated("Unauthorized Access!")
    })?;

    Ok(state.tokens.verify(token)?)
}

/// Fail with `Forbidden` unless the principal's stored role is exactly `required`
pub async fn require_role(
    pool: &sqlx::SqlitePool,
    principal: &Principal,
    required: Role,
) -> Result<Role, ApiError> {
    let role = User::role_of(pool, &principal.email).await?;
    match role {
        Some(r) if r == required => Ok(r),
        other => {
            tracing::warn!(
                email = %principal.email,
                uid = principal.uid.as_deref().unwrap_or("-"),
                required = %required,
                "Role check failed"
            );
            Err(ApiError::role_mismatch(required, other))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        principal_from_parts(parts, state)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Manager {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let principal = principal_from_parts(parts, state)?;
        require_role(&state.db, &principal, Role::Manager).await?;
        Ok(Manager(principal))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let principal = principal_from_parts(parts, state)?;
        require_role(&state.db, &principal, Role::Admin).await?;
        Ok(Admin(principal))
    }
}
