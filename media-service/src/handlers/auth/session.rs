use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use super::{with_session_cookies, without_session_cookies, REFRESH_TOKEN_COOKIE};
use crate::{
    dtos::{
        auth::{LoginRequest, LoginResponse, RefreshRequest},
        MessageResponse,
    },
    middleware::RequestContext,
    services::ServiceError,
    utils::{Password, ValidatedJson},
    AppState,
};

/// Login with username or email and password
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; tokens also set as cookies", body = LoginResponse),
        (status = 400, description = "Missing identifier", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identifier = req
        .identifier()
        .ok_or_else(|| ServiceError::Validation("Username or email is required".to_string()))?
        .to_string();

    let user = state
        .credentials
        .verify_credential(&identifier, Password::new(req.password))
        .await?;
    let tokens = state.sessions.mint_pair(&user).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    let jar = with_session_cookies(jar, &tokens);
    Ok((
        StatusCode::OK,
        jar,
        Json(LoginResponse::new(user.sanitized(), tokens)),
    ))
}

/// Logout: revoke the refresh token and clear session cookies
#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    ctx: RequestContext,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.revoke(&ctx.identity_id).await?;
    Ok((
        StatusCode::OK,
        without_session_cookies(jar),
        Json(MessageResponse::new("Logged out")),
    ))
}

/// Exchange a refresh token for a new pair
///
/// The refresh token is read from the `refreshToken` cookie, falling back to
/// the JSON body.
#[utoipa::path(
    post,
    path = "/api/v1/users/refresh-token",
    request_body(content = RefreshRequest, description = "Optional when the refresh cookie is present"),
    responses(
        (status = 200, description = "Token refreshed", body = TokenResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .filter(|token| !token.trim().is_empty())
        .ok_or(ServiceError::InvalidToken)?;

    let tokens = state.sessions.rotate(&presented).await?;
    let jar = with_session_cookies(jar, &tokens);
    Ok((StatusCode::OK, jar, Json(tokens)))
}
