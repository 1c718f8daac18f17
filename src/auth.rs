//! Request identity.
//!
//! Sessions are handled by the proxy in front of the service, which forwards
//! the signed-in user's id in the `X-User-Id` header. These extractors turn
//! that header into a loaded [`User`] and enforce roles.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use tracing::debug;

use crate::db::DbPool;
use crate::errors::ApiError;
use crate::models::{User, UserRole};
use crate::repo;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request is made on behalf of
///
/// Rejects with 401 when the header is missing or names no known user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> String {
        self.0.get_id()
    }

    /// Rejects with 403 unless the user has one of `allowed`
    pub fn require_role(&self, allowed: &[UserRole]) -> Result<(), ApiError> {
        if allowed.contains(&self.0.get_role()) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("Role '{}' may not do this", self.0.get_role())))
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<DbPool>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let pool = Arc::<DbPool>::from_ref(state);
        let user = repo::get_user(&pool, user_id)?.ok_or_else(|| {
            debug!("Unknown user id in request header");
            ApiError::Unauthorized
        })?;

        Ok(CurrentUser(user))
    }
}

/// A user allowed to change data; viewers are rejected with 403
#[derive(Debug, Clone)]
pub struct RequireWriter(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireWriter
where
    Arc<DbPool>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        user.require_role(&[UserRole::Admin, UserRole::Producer])?;
        Ok(RequireWriter(user))
    }
}
