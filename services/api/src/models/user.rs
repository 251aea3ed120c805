//! User entity, channel profile, and the auth request/response payloads
//!
//! Wire types use camelCase field names; that is the JSON contract the
//! frontend of the original application speaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity as stored in the database
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user creation payload, assembled from the multipart registration
/// request after the media uploads succeeded
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

/// User record as returned to clients: password hash and refresh token are
/// never serialized
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar_url,
            cover_image: user.cover_image_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login request payload: either username or email must be present
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Login response data: the user plus the freshly issued token pair
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Token pair returned by the refresh endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh request body; the token may also arrive via cookie
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Password change request payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Account update payload; at least one field must be present
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

/// Channel profile projection: counts and the subscription-state flag for
/// the requesting viewer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub full_name: String,
    pub username: String,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            full_name: "Alice Doe".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            avatar_url: "https://cdn.example.com/images/a1b2.png".to_string(),
            cover_image_url: None,
            refresh_token: Some("secret-token".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_response_excludes_sensitive_fields() {
        let response = UserResponse::from(sample_user());
        let value = serde_json::to_value(&response).expect("serialization failed");

        let object = value.as_object().expect("expected object");
        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("passwordHash"));
        assert!(!object.contains_key("refreshToken"));
        assert_eq!(value["username"], "alice");
        assert_eq!(value["fullName"], "Alice Doe");
    }

    #[test]
    fn test_channel_profile_field_names() {
        let profile = ChannelProfile {
            full_name: "Alice Doe".to_string(),
            username: "alice".to_string(),
            subscribers_count: 3,
            channels_subscribed_to_count: 1,
            is_subscribed: true,
            avatar: "https://cdn.example.com/images/a1b2.png".to_string(),
            cover_image: None,
            email: "alice@x.com".to_string(),
        };
        let value = serde_json::to_value(&profile).expect("serialization failed");

        assert_eq!(value["subscribersCount"], 3);
        assert_eq!(value["channelsSubscribedToCount"], 1);
        assert_eq!(value["isSubscribed"], true);
    }
}
