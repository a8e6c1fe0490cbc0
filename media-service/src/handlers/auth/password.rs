use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{auth::ChangePasswordRequest, MessageResponse},
    middleware::RequestContext,
    utils::{Password, ValidatedJson},
    AppState,
};

/// Change password for the authenticated user
///
/// Existing sessions stay valid.
#[utoipa::path(
    patch,
    path = "/api/v1/users/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Old password incorrect or not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .credentials
        .change_secret(
            &ctx.identity_id,
            Password::new(req.old_password),
            Password::new(req.new_password),
        )
        .await?;
    Ok((StatusCode::OK, Json(MessageResponse::new("Password changed"))))
}
