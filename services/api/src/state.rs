//! Application state shared across handlers

use crate::jwt::JwtService;
use crate::media_store::MediaStore;
use crate::repositories::{UserRepository, VideoRepository};

/// Application state shared across handlers
///
/// The repositories carry their own pool handles; the state only holds
/// the services the handlers reach for directly.
#[derive(Clone)]
pub struct AppState {
    pub jwt_service: JwtService,
    pub media_store: MediaStore,
    pub user_repository: UserRepository,
    pub video_repository: VideoRepository,
}
