//! Credential and session handlers: registration, login, logout, token
//! refresh, and password change

use axum::{
    extract::{Extension, Json, Multipart, State},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info};

use crate::{
    error::{ApiError, ApiResult},
    media_store::persist_temp_file,
    middleware::{ACCESS_TOKEN_COOKIE, CurrentUser, REFRESH_TOKEN_COOKIE},
    models::{
        ChangePasswordRequest, LoginData, LoginRequest, NewUser, RefreshRequest, TokenPair, User,
        UserResponse,
    },
    response::ApiResponse,
    state::AppState,
    validation,
};

/// Build an HTTP-only, secure token cookie
fn token_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .path("/")
        .build()
}

/// Build the matching removal cookie; the path must match for the browser
/// to drop it
fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// A presented refresh token is only valid while it is the user's single
/// stored value, bit for bit. Rotation overwrites that value, so any token
/// issued earlier stops matching; logout clears it, so nothing matches.
fn refresh_token_matches(stored: Option<&str>, presented: &str) -> bool {
    stored == Some(presented)
}

/// Generate an access/refresh pair and persist the refresh token as the
/// user's single active value
async fn issue_token_pair(state: &AppState, user: &User) -> ApiResult<(String, String)> {
    let internal = |e: anyhow::Error| {
        error!("Failed to generate tokens: {}", e);
        ApiError::Internal(
            "Something went wrong while generating access and refresh tokens".to_string(),
        )
    };

    let access_token = state.jwt_service.generate_access_token(user).map_err(internal)?;
    let refresh_token = state.jwt_service.generate_refresh_token(user).map_err(internal)?;

    state
        .user_repository
        .set_refresh_token(user.id, Some(&refresh_token))
        .await
        .map_err(internal)?;

    Ok((access_token, refresh_token))
}

/// User registration endpoint (multipart: text fields plus avatar and
/// optional cover image files)
pub async fn register_user(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut username = String::new();
    let mut email = String::new();
    let mut full_name = String::new();
    let mut password = String::new();
    let mut avatar_path: Option<PathBuf> = None;
    let mut cover_path: Option<PathBuf> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Malformed multipart payload".to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "username" => {
                username = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid username field".to_string()))?;
            }
            "email" => {
                email = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid email field".to_string()))?;
            }
            "fullName" => {
                full_name = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid fullName field".to_string()))?;
            }
            "password" => {
                password = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid password field".to_string()))?;
            }
            "avatar" | "coverImage" => {
                let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid file upload".to_string()))?;

                let path = persist_temp_file(state.media_store.temp_dir(), &file_name, &bytes)
                    .await
                    .map_err(|e| {
                        error!("Failed to stage uploaded file: {}", e);
                        ApiError::Internal("Failed to store uploaded file".to_string())
                    })?;

                if name == "avatar" {
                    avatar_path = Some(path);
                } else {
                    cover_path = Some(path);
                }
            }
            _ => {}
        }
    }

    // every text field must be present and non-blank
    for (value, field) in [
        (&username, "username"),
        (&email, "email"),
        (&full_name, "fullName"),
        (&password, "password"),
    ] {
        validation::non_empty(value, field).map_err(ApiError::BadRequest)?;
    }
    validation::validate_username(username.trim()).map_err(ApiError::BadRequest)?;
    validation::validate_email(email.trim()).map_err(ApiError::BadRequest)?;

    let username = username.trim().to_lowercase();
    let email = email.trim().to_lowercase();

    let exists = state
        .user_repository
        .exists_by_username_or_email(&username, &email)
        .await
        .map_err(|e| {
            error!("Failed to check for existing user: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;
    if exists {
        return Err(ApiError::Conflict(
            "User with this username or email already exists".to_string(),
        ));
    }

    let avatar_path =
        avatar_path.ok_or_else(|| ApiError::BadRequest("Avatar file is required".to_string()))?;

    let avatar = state.media_store.upload(&avatar_path).await.map_err(|e| {
        error!("Avatar upload failed: {}", e);
        ApiError::BadRequest("Failed to upload avatar file".to_string())
    })?;

    let cover_image = match cover_path {
        Some(path) => Some(state.media_store.upload(&path).await.map_err(|e| {
            error!("Cover image upload failed: {}", e);
            ApiError::BadRequest("Failed to upload cover image file".to_string())
        })?),
        None => None,
    };

    let created = state
        .user_repository
        .create(&NewUser {
            username,
            email,
            full_name: full_name.trim().to_string(),
            password,
            avatar_url: avatar.url,
            cover_image_url: cover_image.map(|asset| asset.url),
        })
        .await
        .map_err(|e| {
            error!("Failed to create user: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;

    // defensive re-read of the freshly created record
    let user = state
        .user_repository
        .find_by_id(created.id)
        .await
        .map_err(|e| {
            error!("Post-create lookup failed: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?
        .ok_or_else(|| {
            ApiError::Internal("Something went wrong while registering the user".to_string())
        })?;

    info!("Registered new user: {}", user.username);

    Ok(ApiResponse::created(
        UserResponse::from(user),
        "User registered successfully",
    ))
}

/// User login endpoint
pub async fn login_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    if username.is_none() && email.is_none() {
        return Err(ApiError::BadRequest(
            "Username or email is required".to_string(),
        ));
    }

    let user = state
        .user_repository
        .find_by_login(username, email)
        .await
        .map_err(|e| {
            error!("Login lookup failed: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    let password_valid = state
        .user_repository
        .verify_password(&user, &payload.password)
        .map_err(|e| {
            error!("Password verification failed: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;
    if !password_valid {
        return Err(ApiError::Unauthorized("Incorrect password".to_string()));
    }

    let (access_token, refresh_token) = issue_token_pair(&state, &user).await?;

    info!("User logged in: {}", user.username);

    let jar = jar
        .add(token_cookie(ACCESS_TOKEN_COOKIE, access_token.clone()))
        .add(token_cookie(REFRESH_TOKEN_COOKIE, refresh_token.clone()));

    let data = LoginData {
        user: UserResponse::from(user),
        access_token,
        refresh_token,
    };

    Ok((
        jar,
        ApiResponse::ok(data, "User logged in successfully"),
    ))
}

/// Logout endpoint: clears the stored refresh token and both cookies
pub async fn logout_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    state
        .user_repository
        .set_refresh_token(user.id, None)
        .await
        .map_err(|e| {
            error!("Failed to clear refresh token: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;

    info!("User logged out: {}", user.username);

    let jar = jar
        .remove(removal_cookie(ACCESS_TOKEN_COOKIE))
        .remove(removal_cookie(REFRESH_TOKEN_COOKIE));

    Ok((jar, ApiResponse::ok(json!({}), "User logged out")))
}

/// Refresh token endpoint
///
/// The presented token must decode with the refresh secret and be
/// bit-equal to the single stored value; a rotated-away token is rejected.
pub async fn refresh_access_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<impl IntoResponse> {
    let incoming = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| body.and_then(|Json(payload)| payload.refresh_token))
        .ok_or_else(|| ApiError::NotFound("Refresh token is missing".to_string()))?;

    let claims = state
        .jwt_service
        .decode_refresh_token(&incoming)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Refresh lookup failed: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    if !refresh_token_matches(user.refresh_token.as_deref(), &incoming) {
        return Err(ApiError::Unauthorized(
            "Refresh token is expired or already used".to_string(),
        ));
    }

    let (access_token, refresh_token) = issue_token_pair(&state, &user).await?;

    let jar = jar
        .add(token_cookie(ACCESS_TOKEN_COOKIE, access_token.clone()))
        .add(token_cookie(REFRESH_TOKEN_COOKIE, refresh_token.clone()));

    let data = TokenPair {
        access_token,
        refresh_token,
    };

    Ok((jar, ApiResponse::ok(data, "Access token refreshed")))
}

/// Password change endpoint; the old password must verify first
pub async fn change_current_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    validation::non_empty(&payload.new_password, "newPassword").map_err(ApiError::BadRequest)?;

    let old_valid = state
        .user_repository
        .verify_password(&user, &payload.old_password)
        .map_err(|e| {
            error!("Password verification failed: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;
    if !old_valid {
        return Err(ApiError::BadRequest("Invalid old password".to_string()));
    }

    state
        .user_repository
        .change_password(user.id, &payload.new_password)
        .await
        .map_err(|e| {
            error!("Failed to change password: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;

    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_refresh_token_matches() {
        assert!(refresh_token_matches(Some("token-a"), "token-a"));
    }

    #[test]
    fn test_rotated_away_token_no_longer_matches() {
        // rotation replaced the stored value, so the older token is dead
        let stored_after_rotation = Some("token-b");
        assert!(!refresh_token_matches(stored_after_rotation, "token-a"));
    }

    #[test]
    fn test_no_stored_token_matches_nothing() {
        // logout clears the stored value
        assert!(!refresh_token_matches(None, "token-a"));
    }

    #[test]
    fn test_near_miss_token_rejected() {
        assert!(!refresh_token_matches(Some("token-a"), "token-a "));
        assert!(!refresh_token_matches(Some("token-a"), "Token-a"));
    }
}
