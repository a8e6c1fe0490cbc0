use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::{
    dtos::auth::TokenResponse,
    models::User,
    services::{store::UserStore, JwtService, ServiceError},
};

/// Mints, rotates and revokes access/refresh token pairs.
///
/// Each identity holds at most one live refresh token, stored as a digest.
/// Rotation is a compare-and-replace on that digest, so a superseded or
/// revoked token can never be exchanged again.
#[derive(Clone)]
pub struct SessionIssuer {
    users: Arc<dyn UserStore>,
    jwt: JwtService,
}

/// SHA-256 of a token, hex encoded.
pub fn digest_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

impl SessionIssuer {
    pub fn new(users: Arc<dyn UserStore>, jwt: JwtService) -> Self {
        Self { users, jwt }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Issue a fresh pair, replacing whatever refresh token was stored.
    pub async fn mint_pair(&self, user: &User) -> Result<TokenResponse, ServiceError> {
        let tokens = self.generate_pair(user)?;

        if !self
            .users
            .set_refresh_token_hash(&user.id, Some(&digest_token(&tokens.refresh_token)))
            .await?
        {
            return Err(ServiceError::UserNotFound);
        }

        tracing::info!(user_id = %user.id, "Session issued");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new pair.
    pub async fn rotate(&self, presented: &str) -> Result<TokenResponse, ServiceError> {
        let claims = self.jwt.validate_refresh_token(presented).map_err(|e| {
            tracing::debug!("Refresh token rejected: {}", e);
            rotation_failed()
        })?;

        let user = self
            .users
            .find_user_by_id(&claims.sub)
            .await?
            .ok_or_else(rotation_failed)?;

        let tokens = self.generate_pair(&user)?;

        let swapped = self
            .users
            .swap_refresh_token_hash(
                &user.id,
                &digest_token(presented),
                &digest_token(&tokens.refresh_token),
            )
            .await?;
        if !swapped {
            tracing::warn!(user_id = %user.id, "Superseded or revoked refresh token presented");
            return Err(rotation_failed());
        }

        metrics::counter!("auth_token_rotations_total", "outcome" => "success").increment(1);
        tracing::info!(user_id = %user.id, "Token refreshed for user");
        Ok(tokens)
    }

    /// Clear the stored refresh token. Outstanding access tokens stay valid
    /// until they expire.
    pub async fn revoke(&self, identity_id: &str) -> Result<(), ServiceError> {
        self.users.set_refresh_token_hash(identity_id, None).await?;
        tracing::info!(user_id = %identity_id, "Session revoked");
        Ok(())
    }

    fn generate_pair(&self, user: &User) -> Result<TokenResponse, ServiceError> {
        let access_token = self
            .jwt
            .generate_access_token(&user.id, &user.username, &user.email)
            .map_err(ServiceError::Internal)?;
        let refresh_token = self
            .jwt
            .generate_refresh_token(&user.id)
            .map_err(ServiceError::Internal)?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }
}

fn rotation_failed() -> ServiceError {
    metrics::counter!("auth_token_rotations_total", "outcome" => "failure").increment(1);
    ServiceError::InvalidToken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::store::InMemoryStore;
    use futures::future::join_all;

    async fn issuer_with_user() -> (SessionIssuer, Arc<InMemoryStore>, User) {
        let store = Arc::new(InMemoryStore::new());
        let jwt = JwtService::new(&JwtConfig {
            access_token_secret: "access-secret-for-tests-0123456789abcdef".into(),
            refresh_token_secret: "refresh-secret-for-tests-0123456789abcdef".into(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 10,
        });
        let user = User::new("alice", "alice@example.com", "Alice", "hash".into());
        store.insert_user(&user).await.unwrap();
        (SessionIssuer::new(store.clone(), jwt), store, user)
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        let digest = digest_token("token_abc");
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, "token_abc");
        assert_eq!(digest, digest_token("token_abc"));
    }

    #[tokio::test]
    async fn test_mint_stores_digest_not_token() {
        let (issuer, store, user) = issuer_with_user().await;
        let pair = issuer.mint_pair(&user).await.unwrap();

        let stored = store.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(
            stored.refresh_token_hash.as_deref(),
            Some(digest_token(&pair.refresh_token).as_str())
        );
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 900);
    }

    #[tokio::test]
    async fn test_rotation_is_single_use() {
        let (issuer, _, user) = issuer_with_user().await;
        let first = issuer.mint_pair(&user).await.unwrap();

        let second = issuer.rotate(&first.refresh_token).await.unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);

        assert!(matches!(
            issuer.rotate(&first.refresh_token).await,
            Err(ServiceError::InvalidToken)
        ));
        assert!(issuer.rotate(&second.refresh_token).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotations_of_one_token_succeed_once() {
        let (issuer, _, user) = issuer_with_user().await;

        for n in [2usize, 8] {
            let presented = issuer.mint_pair(&user).await.unwrap().refresh_token;
            let calls = (0..n).map(|_| {
                let issuer = issuer.clone();
                let presented = presented.clone();
                tokio::spawn(async move { issuer.rotate(&presented).await })
            });
            let results: Vec<_> = join_all(calls)
                .await
                .into_iter()
                .map(|joined| joined.unwrap())
                .collect();

            let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
            assert_eq!(winners.len(), 1);
            assert!(results
                .iter()
                .filter(|r| r.is_err())
                .all(|r| matches!(r, Err(ServiceError::InvalidToken))));

            // Only the winner's token rotates from here.
            assert!(issuer.rotate(&winners[0].refresh_token).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_login_supersedes_previous_refresh_token() {
        let (issuer, _, user) = issuer_with_user().await;
        let old = issuer.mint_pair(&user).await.unwrap();
        issuer.mint_pair(&user).await.unwrap();

        assert!(issuer.rotate(&old.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_revoked_token_cannot_rotate() {
        let (issuer, _, user) = issuer_with_user().await;
        let pair = issuer.mint_pair(&user).await.unwrap();
        issuer.revoke(&user.id).await.unwrap();

        assert!(matches!(
            issuer.rotate(&pair.refresh_token).await,
            Err(ServiceError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let (issuer, _, user) = issuer_with_user().await;
        let pair = issuer.mint_pair(&user).await.unwrap();

        assert!(matches!(
            issuer.rotate(&pair.access_token).await,
            Err(ServiceError::InvalidToken)
        ));
    }
}
