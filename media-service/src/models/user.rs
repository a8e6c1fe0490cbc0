//! User model - the authenticated principal of the platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User stored in the `users` collection.
///
/// `password_hash` is an Argon2 PHC string. `refresh_token_hash` is the
/// SHA-256 digest of the single refresh token currently allowed to rotate;
/// `None` means the user is logged out everywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user. Usernames are stored lowercased.
    pub fn new(username: &str, email: &str, full_name: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username: normalize_username(username),
            email: normalize_email(email),
            full_name: full_name.trim().to_string(),
            avatar: String::new(),
            cover_image: String::new(),
            password_hash,
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Convert to sanitized response (no secret or session fields).
    pub fn sanitized(&self) -> SanitizedUser {
        SanitizedUser::from(self.clone())
    }
}

pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SanitizedUser {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "Alice Liddell")]
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for SanitizedUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            full_name: u.full_name,
            avatar: u.avatar,
            cover_image: u.cover_image,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.avatar.is_none()
            && self.cover_image.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(full_name) = &self.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(avatar) = &self.avatar {
            user.avatar = avatar.clone();
        }
        if let Some(cover_image) = &self.cover_image {
            user.cover_image = cover_image.clone();
        }
        user.updated_at = Utc::now();
    }
}
