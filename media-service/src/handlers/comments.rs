use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{content::ContentRequest, PageQuery},
    middleware::RequestContext,
    utils::ValidatedJson,
    AppState,
};

/// List comments on a video, newest first
#[utoipa::path(
    get,
    path = "/api/v1/comments/{video_id}",
    params(("video_id" = String, Path, description = "Video id"), PageQuery),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    tag = "Comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let comments = state
        .content
        .list_comments(&video_id, (&page).into())
        .await?;
    Ok((StatusCode::OK, Json(comments)))
}

/// Comment on a video
#[utoipa::path(
    post,
    path = "/api/v1/comments/{video_id}",
    params(("video_id" = String, Path, description = "Video id")),
    request_body = ContentRequest,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    tag = "Comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn add_comment(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(video_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = state
        .content
        .add_comment(&ctx.identity_id, &video_id, req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Edit a comment
#[utoipa::path(
    patch,
    path = "/api/v1/comments/c/{comment_id}",
    params(("comment_id" = String, Path, description = "Comment id")),
    request_body = ContentRequest,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    tag = "Comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_comment(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(comment_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = state
        .content
        .update_comment(&ctx.identity_id, &comment_id, req.content)
        .await?;
    Ok((StatusCode::OK, Json(comment)))
}

/// Delete a comment
#[utoipa::path(
    delete,
    path = "/api/v1/comments/c/{comment_id}",
    params(("comment_id" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Deleted comment", body = Comment),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    tag = "Comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(comment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let comment = state
        .content
        .delete_comment(&ctx.identity_id, &comment_id)
        .await?;
    Ok((StatusCode::OK, Json(comment)))
}
