use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::content::ToggleResponse, middleware::RequestContext, models::RelationKind, AppState,
};

/// Like or unlike a video, comment or tweet
///
/// Each call flips the like: the first adds it, the next removes it.
#[utoipa::path(
    post,
    path = "/api/v1/likes/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "One of video, comment, tweet"),
        ("id" = String, Path, description = "Target id")
    ),
    responses(
        (status = 200, description = "Like toggled", body = ToggleResponse),
        (status = 400, description = "Unknown target kind", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Target not found", body = ErrorResponse)
    ),
    tag = "Likes",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn toggle_like(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((kind, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = RelationKind::parse_likeable(&kind).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Cannot like a '{}'", kind))
    })?;

    let (toggled, edge) = state
        .relationships
        .toggle(&ctx.identity_id, kind, &id)
        .await?;
    Ok((StatusCode::OK, Json(ToggleResponse { state: toggled, edge })))
}

/// Videos the caller has liked
#[utoipa::path(
    get,
    path = "/api/v1/likes/videos",
    responses(
        (status = 200, description = "Like edges on videos", body = [RelationshipEdge]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Likes",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn liked_videos(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let edges = state.relationships.liked_videos(&ctx.identity_id).await?;
    Ok((StatusCode::OK, Json(edges)))
}
