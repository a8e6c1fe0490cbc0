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

/// Post a tweet
#[utoipa::path(
    post,
    path = "/api/v1/tweets",
    request_body = ContentRequest,
    responses(
        (status = 201, description = "Tweet created", body = Tweet),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Tweets",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_tweet(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<ContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tweet = state
        .content
        .create_tweet(&ctx.identity_id, req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(tweet)))
}

/// List a user's tweets, newest first
#[utoipa::path(
    get,
    path = "/api/v1/tweets/user/{user_id}",
    params(("user_id" = String, Path, description = "Author id"), PageQuery),
    responses(
        (status = 200, description = "Tweets", body = [Tweet])
    ),
    tag = "Tweets",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_tweets(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let tweets = state.content.list_tweets(&user_id, (&page).into()).await?;
    Ok((StatusCode::OK, Json(tweets)))
}

/// Edit a tweet
#[utoipa::path(
    patch,
    path = "/api/v1/tweets/{id}",
    params(("id" = String, Path, description = "Tweet id")),
    request_body = ContentRequest,
    responses(
        (status = 200, description = "Tweet updated", body = Tweet),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Tweet not found", body = ErrorResponse)
    ),
    tag = "Tweets",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_tweet(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tweet = state
        .content
        .update_tweet(&ctx.identity_id, &id, req.content)
        .await?;
    Ok((StatusCode::OK, Json(tweet)))
}

/// Delete a tweet
#[utoipa::path(
    delete,
    path = "/api/v1/tweets/{id}",
    params(("id" = String, Path, description = "Tweet id")),
    responses(
        (status = 200, description = "Deleted tweet", body = Tweet),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Tweet not found", body = ErrorResponse)
    ),
    tag = "Tweets",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_tweet(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tweet = state.content.delete_tweet(&ctx.identity_id, &id).await?;
    Ok((StatusCode::OK, Json(tweet)))
}
