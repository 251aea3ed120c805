//! API routes
//!
//! Registration, login, and token refresh are public; everything else under
//! `/api/v1/users` sits behind the auth middleware. Video listing is public.

pub mod auth;
pub mod users;
pub mod videos;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;

use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_user_routes = Router::new()
        .route("/logout", post(auth::logout_user))
        .route("/change-password", post(auth::change_current_password))
        .route("/current-user", get(users::get_current_user))
        .route("/update-account", patch(users::update_account_details))
        .route("/avatar", patch(users::update_user_avatar))
        .route("/cover-image", patch(users::update_user_cover_image))
        .route("/c/:username", get(users::get_user_channel_profile))
        .route("/history", get(users::get_watch_history))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let user_routes = Router::new()
        .route("/register", post(auth::register_user))
        .route("/login", post(auth::login_user))
        .route("/refresh-token", post(auth::refresh_access_token))
        .merge(protected_user_routes);

    let video_routes = Router::new()
        .route("/", get(videos::get_all_videos))
        .route("/:user_id", get(videos::get_user_videos));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/users", user_routes)
        .nest("/api/v1/videos", video_routes)
        // media uploads arrive inline as multipart bodies
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "vidtube-api"
    }))
}
