//! Bearer-token authentication for protected routes.
//!
//! `require_auth` runs as a route layer: it rejects the request before the
//! handler when the token is missing or fails verification, and otherwise
//! stores the caller's [`Identity`] in the request extensions where the
//! [`AuthUser`] extractor picks it up.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use shelf_authz::{Identity, TokenService};

use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Token from an `Authorization: Bearer <token>` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(request.headers()) else {
        tracing::warn!(path = %request.uri().path(), "missing bearer token");
        return Err(AppError::unauthorized("Unauthorized Request"));
    };

    let identity = tokens.verify(token).map_err(|e| {
        tracing::warn!(path = %request.uri().path(), error = %e, "token rejected");
        AppError::from(e)
    })?;

    tracing::debug!(user_id = %identity.user_id, "request authenticated");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Identity of the authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl AuthUser {
    pub fn user_id(&self) -> &str {
        &self.0.user_id
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                tracing::warn!("identity missing from request extensions");
                AppError::unauthorized("Unauthorized Request")
            })
    }
}
