/// Access-token authentication middleware
///
/// Validates the `Authorization: Bearer <token>` header on protected
/// routes and injects an [`AuthUser`] into request extensions. Handlers
/// extract it with `Extension<AuthUser>`.
///
/// The refresh endpoint is deliberately *not* behind this middleware:
/// refreshing is authenticated by the HTTP-only cookie, and running it
/// through access-token checks would make an expired access token block
/// the very call that renews it.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use taskhub_shared::auth::jwt;
use uuid::Uuid;

/// Authenticated caller, added to request extensions after token
/// verification
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// Verified user ID from the access token's `sub` claim
    pub user_id: Uuid,
}

/// Middleware that requires a valid access token
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let claims = jwt::verify_access_token(token, &state.config.jwt.access_secret)?;

    req.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
    });

    Ok(next.run(req).await)
}
