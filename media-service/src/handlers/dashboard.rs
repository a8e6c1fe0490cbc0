use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{dtos::PageQuery, middleware::RequestContext, AppState};

/// Totals for the caller's channel
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    responses(
        (status = 200, description = "Channel stats", body = ChannelStats),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Dashboard",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn channel_stats(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.content.channel_stats(&ctx.identity_id).await?;
    Ok((StatusCode::OK, Json(stats)))
}

/// All of the caller's videos, published or not
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/videos",
    params(PageQuery),
    responses(
        (status = 200, description = "Channel videos", body = [Video]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Dashboard",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn channel_videos(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let videos = state
        .content
        .channel_videos(&ctx.identity_id, (&page).into())
        .await?;
    Ok((StatusCode::OK, Json(videos)))
}
