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

/// Subscribe to or unsubscribe from a channel
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/{channel_id}",
    params(("channel_id" = String, Path, description = "Channel (user) id")),
    responses(
        (status = 200, description = "Subscription toggled", body = ToggleResponse),
        (status = 400, description = "Cannot subscribe to yourself", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Channel not found", body = ErrorResponse)
    ),
    tag = "Subscriptions",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn toggle_subscription(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(channel_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (toggled, edge) = state
        .relationships
        .toggle(&ctx.identity_id, RelationKind::Channel, &channel_id)
        .await?;
    Ok((StatusCode::OK, Json(ToggleResponse { state: toggled, edge })))
}

/// Subscribers of a channel
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/c/{channel_id}",
    params(("channel_id" = String, Path, description = "Channel (user) id")),
    responses(
        (status = 200, description = "Subscription edges into the channel", body = [RelationshipEdge])
    ),
    tag = "Subscriptions",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn channel_subscribers(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let edges = state.relationships.subscribers(&channel_id).await?;
    Ok((StatusCode::OK, Json(edges)))
}

/// Channels a user subscribes to
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/u/{subscriber_id}",
    params(("subscriber_id" = String, Path, description = "Subscriber (user) id")),
    responses(
        (status = 200, description = "Subscription edges from the user", body = [RelationshipEdge])
    ),
    tag = "Subscriptions",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn subscribed_channels(
    State(state): State<AppState>,
    Path(subscriber_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let edges = state.relationships.subscriptions(&subscriber_id).await?;
    Ok((StatusCode::OK, Json(edges)))
}
