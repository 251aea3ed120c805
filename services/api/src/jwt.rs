//! JWT service for token generation and validation
//!
//! Access and refresh tokens are HS256-signed with two separate server
//! secrets. Access tokens are short-lived and carry the user's identity;
//! refresh tokens are longer-lived and carry only the user id. Expiry
//! windows come from the environment.

use anyhow::Result;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::models::User;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret used to sign and verify access tokens
    pub access_secret: String,
    /// Secret used to sign and verify refresh tokens
    pub refresh_secret: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 10 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `ACCESS_TOKEN_SECRET`: Secret for signing access tokens (required)
    /// - `REFRESH_TOKEN_SECRET`: Secret for signing refresh tokens (required)
    /// - `ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 864000)
    pub fn from_env() -> Result<Self> {
        let access_secret = std::env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("ACCESS_TOKEN_SECRET environment variable not set"))?;

        let refresh_secret = std::env::var("REFRESH_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("REFRESH_TOKEN_SECRET environment variable not set"))?;

        let access_token_expiry = std::env::var("ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "900".to_string()) // 15 minutes
            .parse()
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "864000".to_string()) // 10 days
            .parse()
            .unwrap_or(864000);

        Ok(JwtConfig {
            access_secret,
            refresh_secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Username, present on access tokens only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Email, present on access tokens only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            access_encoding_key: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
            config,
        }
    }

    fn now() -> Result<u64> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();
        Ok(now)
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> Result<String> {
        let now = Self::now()?;

        let claims = Claims {
            sub: user.id,
            username: Some(user.username.clone()),
            email: Some(user.email.clone()),
            iat: now,
            exp: now + self.config.access_token_expiry,
            token_type: TokenType::Access,
        };

        let token = encode(&Header::default(), &claims, &self.access_encoding_key)?;
        Ok(token)
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user: &User) -> Result<String> {
        let now = Self::now()?;

        let claims = Claims {
            sub: user.id,
            username: None,
            email: None,
            iat: now,
            exp: now + self.config.refresh_token_expiry,
            token_type: TokenType::Refresh,
        };

        let token = encode(&Header::default(), &claims, &self.refresh_encoding_key)?;
        Ok(token)
    }

    /// Validate an access token and return the claims
    pub fn decode_access_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.access_decoding_key, &self.validation)?;

        if token_data.claims.token_type != TokenType::Access {
            anyhow::bail!("Token is not an access token");
        }

        Ok(token_data.claims)
    }

    /// Validate a refresh token and return the claims
    pub fn decode_refresh_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.refresh_decoding_key, &self.validation)?;

        if token_data.claims.token_type != TokenType::Refresh {
            anyhow::bail!("Token is not a refresh token");
        }

        Ok(token_data.claims)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_service() -> JwtService {
        JwtService::new(JwtConfig {
            access_secret: "access-test-secret".to_string(),
            refresh_secret: "refresh-test-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 864000,
        })
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            full_name: "Alice Doe".to_string(),
            password_hash: "hash".to_string(),
            avatar_url: "https://cdn.example.com/images/a.png".to_string(),
            cover_image_url: None,
            refresh_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let service = test_service();
        let user = test_user();

        let token = service.generate_access_token(&user).expect("generation failed");
        let claims = service.decode_access_token(&token).expect("decoding failed");

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username.as_deref(), Some("alice"));
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp, claims.iat + 900);
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let service = test_service();
        let user = test_user();

        let token = service.generate_refresh_token(&user).expect("generation failed");
        let claims = service.decode_refresh_token(&token).expect("decoding failed");

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, None);
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let service = test_service();
        let user = test_user();

        // signed with different secrets and tagged with different types,
        // so each decoder rejects the other's token
        let access = service.generate_access_token(&user).expect("generation failed");
        let refresh = service.generate_refresh_token(&user).expect("generation failed");

        assert!(service.decode_refresh_token(&access).is_err());
        assert!(service.decode_access_token(&refresh).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = test_service();
        let other = JwtService::new(JwtConfig {
            access_secret: "a-different-secret".to_string(),
            refresh_secret: "another-different-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 864000,
        });

        let token = service
            .generate_access_token(&test_user())
            .expect("generation failed");
        assert!(other.decode_access_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = test_service();
        let user = test_user();

        // craft a token whose expiry predates the validation leeway
        let now = JwtService::now().expect("clock failed");
        let claims = Claims {
            sub: user.id,
            username: None,
            email: None,
            iat: now - 7200,
            exp: now - 3600,
            token_type: TokenType::Refresh,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("refresh-test-secret".as_bytes()),
        )
        .expect("encoding failed");

        assert!(service.decode_refresh_token(&token).is_err());
    }
}
