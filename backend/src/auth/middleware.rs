use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use super::{validate_jwt, AuthError, Role};
use crate::error::AppError;
use crate::AppState;

/// Caller identity placed in request extensions by [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AuthError::MissingToken)?;

    let user = validate_jwt(token, &state.config.jwt_secret).map_err(|e| {
        warn!("🚫 Rejected token on {}: {}", request.uri().path(), e);
        e
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Layered inside [`require_auth`]; rejects callers without the admin role.
pub async fn require_admin(user: AuthUser, request: Request<Body>, next: Next) -> Result<Response, AppError> {
    if !user.is_admin() {
        warn!("🚫 User {} attempted admin route {}", user.user_id, request.uri().path());
        return Err(AuthError::Forbidden.into());
    }
    Ok(next.run(request).await)
}
