use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        content::{CreatePlaylistRequest, UpdatePlaylistRequest},
        PageQuery,
    },
    middleware::RequestContext,
    utils::ValidatedJson,
    AppState,
};

/// Create a playlist
#[utoipa::path(
    post,
    path = "/api/v1/playlists",
    request_body = CreatePlaylistRequest,
    responses(
        (status = 201, description = "Playlist created", body = Playlist),
        (status = 400, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Playlists",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_playlist(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<CreatePlaylistRequest>,
) -> Result<impl IntoResponse, AppError> {
    let playlist = state
        .content
        .create_playlist(&ctx.identity_id, req.name, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// List a user's playlists
#[utoipa::path(
    get,
    path = "/api/v1/playlists/user/{user_id}",
    params(("user_id" = String, Path, description = "Owner id"), PageQuery),
    responses(
        (status = 200, description = "Playlists", body = [Playlist])
    ),
    tag = "Playlists",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_playlists(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let playlists = state
        .content
        .list_playlists(&user_id, (&page).into())
        .await?;
    Ok((StatusCode::OK, Json(playlists)))
}

/// Get a playlist by id
#[utoipa::path(
    get,
    path = "/api/v1/playlists/{id}",
    params(("id" = String, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Playlist", body = Playlist),
        (status = 404, description = "Playlist not found", body = ErrorResponse)
    ),
    tag = "Playlists",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let playlist = state.content.get_playlist(&id).await?;
    Ok((StatusCode::OK, Json(playlist)))
}

/// Rename or re-describe a playlist
#[utoipa::path(
    patch,
    path = "/api/v1/playlists/{id}",
    params(("id" = String, Path, description = "Playlist id")),
    request_body = UpdatePlaylistRequest,
    responses(
        (status = 200, description = "Playlist updated", body = Playlist),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Playlist not found", body = ErrorResponse)
    ),
    tag = "Playlists",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_playlist(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdatePlaylistRequest>,
) -> Result<impl IntoResponse, AppError> {
    let playlist = state
        .content
        .update_playlist(&ctx.identity_id, &id, req)
        .await?;
    Ok((StatusCode::OK, Json(playlist)))
}

/// Delete a playlist
#[utoipa::path(
    delete,
    path = "/api/v1/playlists/{id}",
    params(("id" = String, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Deleted playlist", body = Playlist),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Playlist not found", body = ErrorResponse)
    ),
    tag = "Playlists",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_playlist(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let playlist = state
        .content
        .delete_playlist(&ctx.identity_id, &id)
        .await?;
    Ok((StatusCode::OK, Json(playlist)))
}

/// Add a video to a playlist; adding it twice is a no-op
#[utoipa::path(
    patch,
    path = "/api/v1/playlists/add/{video_id}/{playlist_id}",
    params(
        ("video_id" = String, Path, description = "Video id"),
        ("playlist_id" = String, Path, description = "Playlist id")
    ),
    responses(
        (status = 200, description = "Playlist after the add", body = Playlist),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video or playlist not found", body = ErrorResponse)
    ),
    tag = "Playlists",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn add_video(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let playlist = state
        .content
        .add_to_playlist(&ctx.identity_id, &video_id, &playlist_id)
        .await?;
    Ok((StatusCode::OK, Json(playlist)))
}

/// Remove a video from a playlist
#[utoipa::path(
    patch,
    path = "/api/v1/playlists/remove/{video_id}/{playlist_id}",
    params(
        ("video_id" = String, Path, description = "Video id"),
        ("playlist_id" = String, Path, description = "Playlist id")
    ),
    responses(
        (status = 200, description = "Playlist after the removal", body = Playlist),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not in playlist or playlist not found", body = ErrorResponse)
    ),
    tag = "Playlists",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn remove_video(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let playlist = state
        .content
        .remove_from_playlist(&ctx.identity_id, &video_id, &playlist_id)
        .await?;
    Ok((StatusCode::OK, Json(playlist)))
}
