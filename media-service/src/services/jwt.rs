use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT service for token generation and validation.
///
/// Access and refresh tokens are signed with separate HS256 secrets so a
/// refresh token can never pass as an access token and vice versa.
#[derive(Clone)]
pub struct JwtService {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// Claims for access tokens (short-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
}

/// Claims for refresh tokens (long-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        tracing::info!("JWT service initialized with HS256 secrets");
        Self {
            access_encoding_key: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(
                config.refresh_token_secret.as_bytes(),
            ),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    pub fn generate_access_token(
        &self,
        user_id: &str,
        username: &str,
        email: &str,
    ) -> Result<String, anyhow::Error> {
        self.generate_access_token_at(user_id, username, email, Utc::now())
    }

    pub fn generate_access_token_at(
        &self,
        user_id: &str,
        username: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, anyhow::Error> {
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    /// Generate a refresh token. Each carries a fresh `jti`, so two tokens
    /// minted within the same second still differ.
    pub fn generate_refresh_token(&self, user_id: &str) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::days(self.refresh_token_expiry_days);

        let claims = RefreshTokenClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, anyhow::Error> {
        self.validate_access_token_at(token, Utc::now())
    }

    /// Validate signature, then expiry against `now` with no leeway.
    pub fn validate_access_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessTokenClaims, anyhow::Error> {
        let claims: AccessTokenClaims = decode_unexpired(token, &self.access_decoding_key)?;
        check_expiry(claims.exp, now)?;
        Ok(claims)
    }

    pub fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshTokenClaims, anyhow::Error> {
        let claims: RefreshTokenClaims = decode_unexpired(token, &self.refresh_decoding_key)?;
        check_expiry(claims.exp, Utc::now())?;
        Ok(claims)
    }

    /// Get access token expiry in seconds (for client info)
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }

    pub fn refresh_token_expiry_seconds(&self) -> i64 {
        self.refresh_token_expiry_days * 24 * 60 * 60
    }
}

fn decode_unexpired<T: serde::de::DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
) -> Result<T, anyhow::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked by the caller against an explicit clock.
    validation.validate_exp = false;

    let token_data = decode::<T>(token, key, &validation)
        .map_err(|e| anyhow::anyhow!("Invalid token: {}", e))?;
    Ok(token_data.claims)
}

fn check_expiry(exp: i64, now: DateTime<Utc>) -> Result<(), anyhow::Error> {
    if now.timestamp() >= exp {
        anyhow::bail!("Token expired");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_token_secret: "access-secret-for-tests-0123456789abcdef".to_string(),
            refresh_token_secret: "refresh-secret-for-tests-0123456789abcdef".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 10,
        }
    }

    #[test]
    fn test_access_token_generation_and_validation() -> Result<(), anyhow::Error> {
        let service = JwtService::new(&test_config());

        let token = service.generate_access_token("user_123", "alice", "alice@example.com")?;
        assert!(!token.is_empty());

        let claims = service.validate_access_token(&token)?;
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.exp - claims.iat, 15 * 60);

        Ok(())
    }

    #[test]
    fn test_access_token_expires_after_configured_minutes() -> Result<(), anyhow::Error> {
        let service = JwtService::new(&test_config());
        let issued = Utc::now();

        let token = service.generate_access_token_at("user_123", "alice", "a@b.c", issued)?;

        assert!(service
            .validate_access_token_at(&token, issued + Duration::minutes(14))
            .is_ok());
        assert!(service
            .validate_access_token_at(&token, issued + Duration::minutes(16))
            .is_err());

        Ok(())
    }

    #[test]
    fn test_refresh_token_generation_and_validation() -> Result<(), anyhow::Error> {
        let service = JwtService::new(&test_config());

        let token = service.generate_refresh_token("user_123")?;
        let claims = service.validate_refresh_token(&token)?;
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.exp - claims.iat, 10 * 24 * 60 * 60);

        Ok(())
    }

    #[test]
    fn test_refresh_tokens_are_unique() -> Result<(), anyhow::Error> {
        let service = JwtService::new(&test_config());
        let first = service.generate_refresh_token("user_123")?;
        let second = service.generate_refresh_token("user_123")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn test_tokens_are_not_interchangeable() -> Result<(), anyhow::Error> {
        let service = JwtService::new(&test_config());

        let access = service.generate_access_token("user_123", "alice", "a@b.c")?;
        let refresh = service.generate_refresh_token("user_123")?;

        assert!(service.validate_refresh_token(&access).is_err());
        assert!(service.validate_access_token(&refresh).is_err());

        Ok(())
    }

    #[test]
    fn test_tampered_token_rejected() -> Result<(), anyhow::Error> {
        let service = JwtService::new(&test_config());
        let token = service.generate_access_token("user_123", "alice", "a@b.c")?;

        let mut other = test_config();
        other.access_token_secret = "a-completely-different-access-secret-value".to_string();
        let forged = JwtService::new(&other).generate_access_token("user_123", "alice", "a@b.c")?;

        assert!(service.validate_access_token(&forged).is_err());
        assert!(service.validate_access_token(&format!("{}x", token)).is_err());
        assert!(service.validate_access_token("not-a-jwt").is_err());

        Ok(())
    }
}
