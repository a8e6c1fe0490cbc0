use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::SanitizedUser;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Full name is required"))]
    #[schema(example = "Alice Liddell")]
    pub full_name: String,

    #[validate(length(min = 1, max = 64, message = "Username is required"))]
    #[schema(example = "alice")]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "pw1")]
    pub password: String,
}

/// Either `username` or `email` identifies the account.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "pw1")]
    pub password: String,
}

impl LoginRequest {
    /// The identifier to look up, preferring username.
    pub fn identifier(&self) -> Option<&str> {
        fn non_blank(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        non_blank(&self.username).or_else(|| non_blank(&self.email))
    }
}

/// Refresh token in the body, for clients that do not keep cookies.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[schema(example = "eyJhbGciOiJIUzI1NiJ9...")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, message = "Full name must not be empty"))]
    #[schema(example = "Alice L.")]
    pub full_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.org")]
    pub email: Option<String>,
}

/// Token pair returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds
    #[schema(example = 900)]
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: SanitizedUser,
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    #[schema(example = 900)]
    pub expires_in: i64,
}

impl LoginResponse {
    pub fn new(user: SanitizedUser, tokens: TokenResponse) -> Self {
        Self {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
        }
    }
}
