//! API models for entities, requests, and responses

pub mod user;
pub mod video;

// Re-export for convenience
pub use user::{
    ChangePasswordRequest, ChannelProfile, LoginData, LoginRequest, NewUser, RefreshRequest,
    TokenPair, UpdateAccountRequest, User, UserResponse,
};
pub use video::{VideoOwner, VideoQuery, VideoWithOwner};
