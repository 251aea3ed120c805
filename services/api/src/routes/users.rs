//! Profile handlers: current user, account updates, avatar/cover
//! replacement, channel profile, and watch history

use axum::{
    body::Bytes,
    extract::{Extension, Json, Multipart, Path, State},
    response::IntoResponse,
};
use tracing::error;

use crate::{
    error::{ApiError, ApiResult},
    media_store::{ResourceKind, persist_temp_file, storage_id_from_url},
    middleware::CurrentUser,
    models::{UpdateAccountRequest, UserResponse},
    response::ApiResponse,
    state::AppState,
};

/// Pull the named file part out of a multipart body
async fn read_file_field(
    multipart: &mut Multipart,
    name: &str,
) -> ApiResult<Option<(String, Bytes)>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Malformed multipart payload".to_string()))?
    {
        if field.name() != Some(name) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.bin").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Invalid file upload".to_string()))?;

        return Ok(Some((file_name, bytes)));
    }

    Ok(None)
}

/// Stage an uploaded file and push it to the media host
async fn upload_staged(
    state: &AppState,
    file_name: &str,
    bytes: &[u8],
    failure_message: &str,
) -> ApiResult<String> {
    let temp_path = persist_temp_file(state.media_store.temp_dir(), file_name, bytes)
        .await
        .map_err(|e| {
            error!("Failed to stage uploaded file: {}", e);
            ApiError::Internal("Failed to store uploaded file".to_string())
        })?;

    let asset = state.media_store.upload(&temp_path).await.map_err(|e| {
        error!("Media upload failed: {}", e);
        ApiError::BadRequest(failure_message.to_string())
    })?;

    Ok(asset.url)
}

/// Current user endpoint; the record was attached by the auth middleware
pub async fn get_current_user(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::ok(
        UserResponse::from(user),
        "Current user fetched successfully",
    ))
}

/// Account details update endpoint; at least one field must be provided
pub async fn update_account_details(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<UpdateAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let full_name = payload
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    if full_name.is_none() && email.is_none() {
        return Err(ApiError::BadRequest(
            "Full name or email is required".to_string(),
        ));
    }

    let updated = state
        .user_repository
        .update_account(user.id, full_name, email)
        .await
        .map_err(|e| {
            error!("Failed to update account details: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;

    Ok(ApiResponse::ok(
        UserResponse::from(updated),
        "Account details updated successfully",
    ))
}

/// Avatar replacement endpoint
///
/// The old asset's storage id must be extractable from the stored URL
/// before the new file is uploaded; the old asset is then deleted best
/// effort after the new upload succeeds.
pub async fn update_user_avatar(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let (file_name, bytes) = read_file_field(&mut multipart, "avatar")
        .await?
        .ok_or_else(|| ApiError::BadRequest("Avatar file is required".to_string()))?;

    let old_storage_id = storage_id_from_url(&user.avatar_url)
        .ok_or_else(|| {
            ApiError::BadRequest(
                "Could not extract identifier from the current avatar URL".to_string(),
            )
        })?
        .to_string();

    let url = upload_staged(&state, &file_name, &bytes, "Failed to upload avatar file").await?;

    state
        .media_store
        .delete(&old_storage_id, ResourceKind::Image)
        .await;

    let updated = state
        .user_repository
        .set_avatar_url(user.id, &url)
        .await
        .map_err(|e| {
            error!("Failed to persist avatar URL: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;

    Ok(ApiResponse::ok(
        UserResponse::from(updated),
        "Avatar updated successfully",
    ))
}

/// Cover image replacement endpoint; behaves like the avatar path except
/// that a user may not have a previous cover image at all
pub async fn update_user_cover_image(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let (file_name, bytes) = read_file_field(&mut multipart, "coverImage")
        .await?
        .ok_or_else(|| ApiError::BadRequest("Cover image file is required".to_string()))?;

    let old_storage_id = match user.cover_image_url.as_deref().filter(|u| !u.is_empty()) {
        Some(old_url) => Some(
            storage_id_from_url(old_url)
                .ok_or_else(|| {
                    ApiError::BadRequest(
                        "Could not extract identifier from the current cover image URL"
                            .to_string(),
                    )
                })?
                .to_string(),
        ),
        None => None,
    };

    let url =
        upload_staged(&state, &file_name, &bytes, "Failed to upload cover image file").await?;

    if let Some(storage_id) = old_storage_id {
        state
            .media_store
            .delete(&storage_id, ResourceKind::Image)
            .await;
    }

    let updated = state
        .user_repository
        .set_cover_image_url(user.id, &url)
        .await
        .map_err(|e| {
            error!("Failed to persist cover image URL: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;

    Ok(ApiResponse::ok(
        UserResponse::from(updated),
        "Cover image updated successfully",
    ))
}

/// Channel profile endpoint: subscriber counts and the viewer's
/// subscription state for the named channel
pub async fn get_user_channel_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(viewer)): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is missing".to_string()));
    }

    let profile = state
        .user_repository
        .channel_profile(username, viewer.id)
        .await
        .map_err(|e| {
            error!("Failed to fetch channel profile: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?
        .ok_or_else(|| ApiError::NotFound("Channel does not exist".to_string()))?;

    Ok(ApiResponse::ok(
        profile,
        "User channel fetched successfully",
    ))
}

/// Watch history endpoint: the user's ordered history resolved into
/// enriched video documents
pub async fn get_watch_history(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let history = state
        .user_repository
        .watch_history(user.id)
        .await
        .map_err(|e| {
            error!("Failed to fetch watch history: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;

    Ok(ApiResponse::ok(
        history,
        "Watch history fetched successfully",
    ))
}
