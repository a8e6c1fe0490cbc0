use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::auth::UpdateAccountRequest,
    middleware::RequestContext,
    services::ProfileImage,
    utils::{StagedForm, ValidatedJson},
    AppState,
};

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/v1/users/current-user",
    responses(
        (status = 200, description = "Current user", body = SanitizedUser),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn current_user(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let user = state.credentials.current(&ctx.identity_id).await?;
    Ok((StatusCode::OK, Json(user)))
}

/// Public profile of a channel by username
///
/// Includes subscriber counts and whether the caller is subscribed.
#[utoipa::path(
    get,
    path = "/api/v1/users/c/{username}",
    params(
        ("username" = String, Path, description = "Channel username")
    ),
    responses(
        (status = 200, description = "Channel profile", body = ChannelProfile),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Channel not found", body = ErrorResponse)
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn channel_profile(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .relationships
        .channel_profile(&ctx.identity_id, &username)
        .await?;
    Ok((StatusCode::OK, Json(profile)))
}

/// Update full name and/or email
#[utoipa::path(
    patch,
    path = "/api/v1/users/update-account",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = SanitizedUser),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_account(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<UpdateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .credentials
        .update_account(&ctx.identity_id, req)
        .await?;
    Ok((StatusCode::OK, Json(user)))
}

/// Replace the avatar image
#[utoipa::path(
    patch,
    path = "/api/v1/users/avatar",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar updated", body = SanitizedUser),
        (status = 400, description = "Missing file", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Upload failed", body = ErrorResponse)
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_avatar(
    State(state): State<AppState>,
    ctx: RequestContext,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    replace_image(&state, &ctx, ProfileImage::Avatar, "avatar", multipart).await
}

/// Replace the cover image
#[utoipa::path(
    patch,
    path = "/api/v1/users/cover-image",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Cover image updated", body = SanitizedUser),
        (status = 400, description = "Missing file", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Upload failed", body = ErrorResponse)
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_cover_image(
    State(state): State<AppState>,
    ctx: RequestContext,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    replace_image(&state, &ctx, ProfileImage::CoverImage, "coverImage", multipart).await
}

async fn replace_image(
    state: &AppState,
    ctx: &RequestContext,
    image: ProfileImage,
    field: &str,
    multipart: Multipart,
) -> Result<(StatusCode, Json<crate::models::SanitizedUser>), AppError> {
    let mut form = StagedForm::read(multipart, &state.config.upload.tmp_dir).await?;
    let path = form.take_file(field)?;

    let user = state
        .credentials
        .update_image(&ctx.identity_id, image, &path)
        .await?;
    Ok((StatusCode::OK, Json(user)))
}
