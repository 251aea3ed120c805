//! Video catalog handlers: global listing and per-user listing

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{VideoQuery, VideoWithOwner},
    response::ApiResponse,
    state::AppState,
};

/// Paginated, filterable listing of published videos
pub async fn get_all_videos(
    State(state): State<AppState>,
    Query(query): Query<VideoQuery>,
) -> ApiResult<impl IntoResponse> {
    let videos = state.video_repository.list(&query).await.map_err(|e| {
        error!("Failed to list videos: {}", e);
        ApiError::Internal("Internal server error".to_string())
    })?;

    // an empty page is reported as 404, but still in the success envelope
    // with an empty list
    if videos.is_empty() {
        return Ok(ApiResponse::new(
            StatusCode::NOT_FOUND,
            Vec::<VideoWithOwner>::new(),
            "No videos found",
        ));
    }

    Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}

/// Published videos of a single user
pub async fn get_user_videos(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<VideoQuery>,
) -> ApiResult<impl IntoResponse> {
    let owner_id = Uuid::parse_str(user_id.trim())
        .map_err(|_| ApiError::BadRequest("Invalid user id".to_string()))?;

    let videos = state
        .video_repository
        .list_by_owner(owner_id, &query)
        .await
        .map_err(|e| {
            error!("Failed to list user videos: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?;

    if videos.is_empty() {
        return Err(ApiError::NotFound("No videos found".to_string()));
    }

    Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}
