use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::content::{UpdateVideoRequest, VideoListQuery},
    middleware::RequestContext,
    services::{store::Page, ServiceError},
    utils::{StagedForm, ValidatedJson},
    AppState,
};

/// Publish a video
///
/// Both files are uploaded to the media host before the record is created.
#[utoipa::path(
    post,
    path = "/api/v1/videos",
    request_body(content = VideoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Video published", body = Video),
        (status = 400, description = "Missing field or file", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Upload failed", body = ErrorResponse)
    ),
    tag = "Videos",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn publish_video(
    State(state): State<AppState>,
    ctx: RequestContext,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = StagedForm::read(multipart, &state.config.upload.tmp_dir).await?;
    let title = form.text("title").map(str::trim).unwrap_or_default().to_string();
    let description = form
        .text("description")
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    // Reject before taking the files so the form still cleans them up.
    if title.is_empty() || description.is_empty() {
        return Err(ServiceError::Validation("Title and description are required".to_string()).into());
    }
    let [video_file, thumbnail] = form.take_files(["videoFile", "thumbnail"])?;

    let video = state
        .content
        .publish_video(&ctx.identity_id, title, description, &video_file, &thumbnail)
        .await?;
    Ok((StatusCode::CREATED, Json(video)))
}

/// List a channel's videos, newest first
///
/// Unpublished videos are only listed for their owner.
#[utoipa::path(
    get,
    path = "/api/v1/videos",
    params(VideoListQuery),
    responses(
        (status = 200, description = "Videos", body = [Video]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Videos",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_videos(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<VideoListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let videos = state
        .content
        .list_videos(
            &ctx.identity_id,
            &query.user_id,
            Page::new(query.page, query.limit),
        )
        .await?;
    Ok((StatusCode::OK, Json(videos)))
}

/// Get a video by id
#[utoipa::path(
    get,
    path = "/api/v1/videos/{id}",
    params(("id" = String, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video", body = Video),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    tag = "Videos",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_video(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let video = state.content.get_video(&ctx.identity_id, &id).await?;
    Ok((StatusCode::OK, Json(video)))
}

/// Update a video's title and/or description
#[utoipa::path(
    patch,
    path = "/api/v1/videos/{id}",
    params(("id" = String, Path, description = "Video id")),
    request_body = UpdateVideoRequest,
    responses(
        (status = 200, description = "Video updated", body = Video),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    tag = "Videos",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_video(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateVideoRequest>,
) -> Result<impl IntoResponse, AppError> {
    let video = state
        .content
        .update_video(&ctx.identity_id, &id, req)
        .await?;
    Ok((StatusCode::OK, Json(video)))
}

/// Delete a video
#[utoipa::path(
    delete,
    path = "/api/v1/videos/{id}",
    params(("id" = String, Path, description = "Video id")),
    responses(
        (status = 200, description = "Deleted video", body = Video),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    tag = "Videos",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_video(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let video = state.content.delete_video(&ctx.identity_id, &id).await?;
    Ok((StatusCode::OK, Json(video)))
}

/// Flip a video between published and unpublished
#[utoipa::path(
    patch,
    path = "/api/v1/videos/toggle/publish/{id}",
    params(("id" = String, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video with flipped publish state", body = Video),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    tag = "Videos",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn toggle_publish(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let video = state.content.toggle_publish(&ctx.identity_id, &id).await?;
    Ok((StatusCode::OK, Json(video)))
}
