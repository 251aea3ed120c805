//! User repository for database operations
//!
//! Password hashing and verification live here: handlers never see a hash.

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{ChannelProfile, NewUser, User, VideoOwner, VideoWithOwner};

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, avatar_url, \
     cover_image_url, refresh_token, created_at, updated_at";

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        password_hash: row.get("password_hash"),
        avatar_url: row.get("avatar_url"),
        cover_image_url: row.get("cover_image_url"),
        refresh_token: row.get("refresh_token"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(hash)
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user; username and email are stored lowercased
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.username);

        let password_hash = hash_password(&new_user.password)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (username, email, full_name, password_hash, avatar_url, cover_image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(new_user.username.to_lowercase())
        .bind(new_user.email.to_lowercase())
        .bind(&new_user.full_name)
        .bind(&password_hash)
        .bind(&new_user.avatar_url)
        .bind(&new_user.cover_image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    /// Check whether a user with this username or email already exists
    pub async fn exists_by_username_or_email(&self, username: &str, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)
            "#,
        )
        .bind(username.to_lowercase())
        .bind(email.to_lowercase())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Find a user by username or email, whichever identifier was supplied
    pub async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::text IS NOT NULL AND username = $1)
               OR ($2::text IS NOT NULL AND email = $2)
            "#,
        ))
        .bind(username.map(|u| u.to_lowercase()))
        .bind(email.map(|e| e.to_lowercase()))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Verify a user's password against the stored hash
    pub fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        let argon2 = Argon2::default();
        let result = argon2.verify_password(password.as_bytes(), &parsed_hash);

        Ok(result.is_ok())
    }

    /// Persist or clear the single active refresh token for a user
    ///
    /// This is a single-column write; concurrent rotations race
    /// last-writer-wins by design.
    pub async fn set_refresh_token(&self, id: Uuid, refresh_token: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET refresh_token = $2, updated_at = now() WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(refresh_token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the stored password hash
    pub async fn change_password(&self, id: Uuid, new_password: &str) -> Result<()> {
        let password_hash = hash_password(new_password)?;

        sqlx::query(
            r#"
            UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&password_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Update the account details that were provided, leaving the rest alone
    pub async fn update_account(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(full_name)
        .bind(email.map(|e| e.to_lowercase()))
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    /// Persist a freshly uploaded avatar URL
    pub async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET avatar_url = $2, updated_at = now() WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(avatar_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    /// Persist a freshly uploaded cover image URL
    pub async fn set_cover_image_url(&self, id: Uuid, cover_image_url: &str) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET cover_image_url = $2, updated_at = now() WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(cover_image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    /// Channel profile for `username` as seen by `viewer_id`: subscriber
    /// counts plus whether the viewer subscribes to this channel
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Uuid,
    ) -> Result<Option<ChannelProfile>> {
        let row = sqlx::query(
            r#"
            SELECT u.full_name, u.username, u.email, u.avatar_url, u.cover_image_url,
                   (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id)
                       AS subscribers_count,
                   (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id)
                       AS channels_subscribed_to_count,
                   EXISTS (SELECT 1 FROM subscriptions s
                           WHERE s.channel_id = u.id AND s.subscriber_id = $2)
                       AS is_subscribed
            FROM users u
            WHERE u.username = $1
            "#,
        )
        .bind(username.to_lowercase())
        .bind(viewer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ChannelProfile {
            full_name: row.get("full_name"),
            username: row.get("username"),
            subscribers_count: row.get("subscribers_count"),
            channels_subscribed_to_count: row.get("channels_subscribed_to_count"),
            is_subscribed: row.get("is_subscribed"),
            avatar: row.get("avatar_url"),
            cover_image: row.get("cover_image_url"),
            email: row.get("email"),
        }))
    }

    /// Resolve a user's ordered watch history into enriched video documents
    pub async fn watch_history(&self, user_id: Uuid) -> Result<Vec<VideoWithOwner>> {
        let rows = sqlx::query(
            r#"
            SELECT v.id, v.title, v.description, v.video_url, v.thumbnail_url,
                   v.duration, v.views, v.is_published, v.created_at,
                   u.username, u.full_name, u.avatar_url
            FROM watch_history wh
            JOIN videos v ON v.id = wh.video_id
            JOIN users u ON u.id = v.owner_id
            WHERE wh.user_id = $1
            ORDER BY wh.position
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let videos = rows
            .into_iter()
            .map(|row| VideoWithOwner {
                id: row.get("id"),
                owner: VideoOwner {
                    username: row.get("username"),
                    full_name: row.get("full_name"),
                    avatar: row.get("avatar_url"),
                },
                video_file: row.get("video_url"),
                thumbnail: row.get("thumbnail_url"),
                title: row.get("title"),
                description: row.get("description"),
                duration: row.get("duration"),
                views: row.get("views"),
                is_published: row.get("is_published"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("s3cret-Pass!").expect("hashing failed");
        assert!(hash.starts_with("$argon2"));

        let parsed = PasswordHash::new(&hash).expect("parse failed");
        assert!(
            Argon2::default()
                .verify_password(b"s3cret-Pass!", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong-password", &parsed)
                .is_err()
        );
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").expect("hashing failed");
        let b = hash_password("same-password").expect("hashing failed");
        assert_ne!(a, b);
    }
}
