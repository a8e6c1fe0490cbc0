use std::path::Path;
use std::sync::Arc;

use crate::{
    dtos::auth::{RegisterRequest, UpdateAccountRequest},
    models::{
        user::{normalize_email, normalize_username},
        ProfileUpdate, SanitizedUser, User,
    },
    services::{
        store::{StoreError, UserStore},
        MediaUploader, ServiceError,
    },
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

/// Identity records and secret verification.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
    uploader: Arc<dyn MediaUploader>,
}

/// Which profile image an upload replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Avatar,
    CoverImage,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>, uploader: Arc<dyn MediaUploader>) -> Self {
        Self { users, uploader }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<SanitizedUser, ServiceError> {
        if [&req.full_name, &req.username, &req.email, &req.password]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ServiceError::Validation("All fields are required".to_string()));
        }

        let username = normalize_username(&req.username);
        let email = normalize_email(&req.email);

        if self
            .users
            .find_user_by_username_or_email(&username, &email)
            .await?
            .is_some()
        {
            return Err(ServiceError::UserAlreadyExists);
        }

        let password_hash = hash_password(&Password::new(req.password))?;
        let user = User::new(&username, &email, &req.full_name, password_hash.into_string());

        // A concurrent registration can pass the check above; the unique
        // indexes settle it.
        self.users.insert_user(&user).await.map_err(|e| match e {
            StoreError::Duplicate => ServiceError::UserAlreadyExists,
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user.sanitized())
    }

    /// Look up by username or email and verify the secret.
    ///
    /// An unknown identifier and a wrong secret produce the same error.
    pub async fn verify_credential(
        &self,
        identifier: &str,
        password: Password,
    ) -> Result<User, ServiceError> {
        let identifier = identifier.trim().to_lowercase();
        let user = match self
            .users
            .find_user_by_username_or_email(&identifier, &identifier)
            .await?
        {
            Some(user) => user,
            None => {
                metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
                return Err(ServiceError::InvalidCredentials);
            }
        };

        if verify_password(&password, &PasswordHashString::new(user.password_hash.clone())).is_err()
        {
            tracing::warn!(user_id = %user.id, "Password verification failed");
            metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
            return Err(ServiceError::InvalidCredentials);
        }

        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        Ok(user)
    }

    pub async fn change_secret(
        &self,
        identity_id: &str,
        old_password: Password,
        new_password: Password,
    ) -> Result<(), ServiceError> {
        if new_password.as_str().trim().is_empty() {
            return Err(ServiceError::Validation("New password is required".to_string()));
        }

        let user = self
            .users
            .find_user_by_id(identity_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        verify_password(
            &old_password,
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        let new_hash = hash_password(&new_password)?;
        if !self
            .users
            .set_password_hash(&user.id, new_hash.as_str())
            .await?
        {
            return Err(ServiceError::UserNotFound);
        }

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    pub async fn update_account(
        &self,
        identity_id: &str,
        req: UpdateAccountRequest,
    ) -> Result<SanitizedUser, ServiceError> {
        let update = ProfileUpdate {
            full_name: req
                .full_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            email: req
                .email
                .map(|e| normalize_email(&e))
                .filter(|e| !e.is_empty()),
            ..Default::default()
        };
        if update.is_empty() {
            return Err(ServiceError::Validation(
                "At least one of full_name or email is required".to_string(),
            ));
        }

        self.apply_update(identity_id, &update).await
    }

    /// Upload a local file and store its URL as the avatar or cover image.
    pub async fn update_image(
        &self,
        identity_id: &str,
        image: ProfileImage,
        path: &Path,
    ) -> Result<SanitizedUser, ServiceError> {
        let media = self.uploader.upload(path).await.map_err(ServiceError::Upload)?;

        let update = match image {
            ProfileImage::Avatar => ProfileUpdate {
                avatar: Some(media.url),
                ..Default::default()
            },
            ProfileImage::CoverImage => ProfileUpdate {
                cover_image: Some(media.url),
                ..Default::default()
            },
        };
        self.apply_update(identity_id, &update).await
    }

    pub async fn current(&self, identity_id: &str) -> Result<SanitizedUser, ServiceError> {
        self.users
            .find_user_by_id(identity_id)
            .await?
            .map(|u| u.sanitized())
            .ok_or(ServiceError::UserNotFound)
    }

    async fn apply_update(
        &self,
        identity_id: &str,
        update: &ProfileUpdate,
    ) -> Result<SanitizedUser, ServiceError> {
        let user = self
            .users
            .update_profile(identity_id, update)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => ServiceError::EmailAlreadyInUse,
                other => other.into(),
            })?
            .ok_or(ServiceError::UserNotFound)?;
        Ok(user.sanitized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{store::InMemoryStore, MockUploader};

    fn credentials() -> CredentialStore {
        CredentialStore::new(Arc::new(InMemoryStore::new()), Arc::new(MockUploader::new()))
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            full_name: "Alice".into(),
            username: "Alice".into(),
            email: "alice@example.com".into(),
            password: "pw1".into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_verify() {
        let creds = credentials();
        let user = creds.register(alice()).await.unwrap();
        assert_eq!(user.username, "alice");

        let by_name = creds
            .verify_credential("alice", Password::new("pw1".into()))
            .await
            .unwrap();
        let by_email = creds
            .verify_credential("ALICE@example.com", Password::new("pw1".into()))
            .await
            .unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_email.id, user.id);
        assert_ne!(by_name.password_hash, "pw1");
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict() {
        let creds = credentials();
        creds.register(alice()).await.unwrap();
        assert!(matches!(
            creds.register(alice()).await,
            Err(ServiceError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_register_blank_field_is_rejected() {
        let creds = credentials();
        let mut req = alice();
        req.full_name = "   ".into();
        assert!(matches!(
            creds.register(req).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_are_indistinguishable() {
        let creds = credentials();
        creds.register(alice()).await.unwrap();

        let wrong_password = creds
            .verify_credential("alice", Password::new("nope".into()))
            .await
            .unwrap_err();
        let unknown_user = creds
            .verify_credential("mallory", Password::new("nope".into()))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, ServiceError::InvalidCredentials));
        assert!(matches!(unknown_user, ServiceError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_change_secret_requires_old_secret() {
        let creds = credentials();
        let user = creds.register(alice()).await.unwrap();

        assert!(matches!(
            creds
                .change_secret(&user.id, Password::new("bad".into()), Password::new("pw2".into()))
                .await,
            Err(ServiceError::InvalidCredentials)
        ));

        creds
            .change_secret(&user.id, Password::new("pw1".into()), Password::new("pw2".into()))
            .await
            .unwrap();
        assert!(creds
            .verify_credential("alice", Password::new("pw1".into()))
            .await
            .is_err());
        assert!(creds
            .verify_credential("alice", Password::new("pw2".into()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_update_account_email_conflict() {
        let creds = credentials();
        let alice = creds.register(alice()).await.unwrap();
        creds
            .register(RegisterRequest {
                full_name: "Bob".into(),
                username: "bob".into(),
                email: "bob@example.com".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();

        let taken = UpdateAccountRequest {
            full_name: None,
            email: Some("BOB@example.com".into()),
        };
        assert!(matches!(
            creds.update_account(&alice.id, taken).await,
            Err(ServiceError::EmailAlreadyInUse)
        ));

        let empty = UpdateAccountRequest {
            full_name: None,
            email: None,
        };
        assert!(matches!(
            creds.update_account(&alice.id, empty).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_image_stores_uploaded_url() {
        let creds = credentials();
        let alice = creds.register(alice()).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("me.png");
        tokio::fs::write(&path, b"png").await.unwrap();

        let updated = creds
            .update_image(&alice.id, ProfileImage::Avatar, &path)
            .await
            .unwrap();
        assert_eq!(updated.avatar, "https://media.test/me.png");
        assert!(updated.cover_image.is_empty());
    }
}
