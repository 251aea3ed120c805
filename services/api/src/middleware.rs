//! Authentication middleware for access-token validation
//!
//! The token is taken from the `Authorization: Bearer` header or, failing
//! that, from the `accessToken` cookie. On success the full user record is
//! attached to the request for downstream handlers.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{error::ApiError, models::User, state::AppState};

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Authenticated user attached to the request by the middleware
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // Bearer header first, accessToken cookie as fallback
    let bearer = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.to_string());

    let token = match bearer {
        Some(token) => token,
        None => CookieJar::from_headers(req.headers())
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".to_string()))?,
    };

    // Validate the token
    let claims = state
        .jwt_service
        .decode_access_token(&token)
        .map_err(|_| ApiError::Unauthorized("Invalid access token".to_string()))?;

    // Attach the full user record for handlers
    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to look up user for token subject: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?
        .ok_or_else(|| ApiError::Unauthorized("Invalid access token".to_string()))?;

    req.extensions_mut().insert(CurrentUser(user));

    // Call the next service
    let response = next.run(req).await;

    Ok(response)
}
