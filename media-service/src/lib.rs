pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Json, Router,
};
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Environment, MediaConfig, SecurityConfig, SwaggerMode};
use crate::services::{
    ContentService, CredentialStore, JwtService, MediaUploader, SessionIssuer, Store,
    ToggleRelationship,
};

/// Upper bound on multipart bodies (video + thumbnail).
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::auth::registration::register,
        handlers::auth::session::login,
        handlers::auth::session::logout,
        handlers::auth::session::refresh_token,
        handlers::auth::password::change_password,
        handlers::user::current_user,
        handlers::user::update_account,
        handlers::user::update_avatar,
        handlers::user::update_cover_image,
        handlers::user::channel_profile,
        handlers::videos::publish_video,
        handlers::videos::list_videos,
        handlers::videos::get_video,
        handlers::videos::update_video,
        handlers::videos::delete_video,
        handlers::videos::toggle_publish,
        handlers::comments::list_comments,
        handlers::comments::add_comment,
        handlers::comments::update_comment,
        handlers::comments::delete_comment,
        handlers::tweets::create_tweet,
        handlers::tweets::list_tweets,
        handlers::tweets::update_tweet,
        handlers::tweets::delete_tweet,
        handlers::playlists::create_playlist,
        handlers::playlists::list_playlists,
        handlers::playlists::get_playlist,
        handlers::playlists::update_playlist,
        handlers::playlists::delete_playlist,
        handlers::playlists::add_video,
        handlers::playlists::remove_video,
        handlers::likes::toggle_like,
        handlers::likes::liked_videos,
        handlers::subscriptions::toggle_subscription,
        handlers::subscriptions::channel_subscribers,
        handlers::subscriptions::subscribed_channels,
        handlers::dashboard::channel_stats,
        handlers::dashboard::channel_videos,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::LoginRequest,
            dtos::auth::LoginResponse,
            dtos::auth::RefreshRequest,
            dtos::auth::TokenResponse,
            dtos::auth::ChangePasswordRequest,
            dtos::auth::UpdateAccountRequest,
            dtos::content::VideoUploadForm,
            dtos::content::ImageUploadForm,
            dtos::content::UpdateVideoRequest,
            dtos::content::ContentRequest,
            dtos::content::CreatePlaylistRequest,
            dtos::content::UpdatePlaylistRequest,
            dtos::content::ToggleResponse,
            dtos::content::ChannelStats,
            dtos::content::ChannelProfile,
            models::SanitizedUser,
            models::Video,
            models::Comment,
            models::Tweet,
            models::Playlist,
            models::RelationKind,
            models::RelationshipEdge,
            models::ToggleState,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and token rotation"),
        (name = "User", description = "Profile management"),
        (name = "Videos", description = "Video publishing"),
        (name = "Comments", description = "Comments on videos"),
        (name = "Tweets", description = "Short posts"),
        (name = "Playlists", description = "Video playlists"),
        (name = "Likes", description = "Like toggles"),
        (name = "Subscriptions", description = "Channel subscriptions"),
        (name = "Dashboard", description = "Channel statistics"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: MediaConfig,
    pub store: Store,
    pub jwt: JwtService,
    pub credentials: CredentialStore,
    pub sessions: SessionIssuer,
    pub relationships: ToggleRelationship,
    pub content: ContentService,
}

impl AppState {
    pub fn new(config: MediaConfig, store: Store, uploader: Arc<dyn MediaUploader>) -> Self {
        let jwt = JwtService::new(&config.jwt);
        Self {
            credentials: CredentialStore::new(store.users.clone(), uploader.clone()),
            sessions: SessionIssuer::new(store.users.clone(), jwt.clone()),
            relationships: ToggleRelationship::new(store.clone()),
            content: ContentService::new(store.clone(), uploader),
            jwt,
            store,
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/users/register", post(handlers::auth::register))
        .route("/users/login", post(handlers::auth::login))
        .route("/users/refresh-token", post(handlers::auth::refresh_token));

    let protected = Router::new()
        .route("/users/logout", post(handlers::auth::logout))
        .route(
            "/users/change-password",
            patch(handlers::auth::change_password),
        )
        .route("/users/current-user", get(handlers::user::current_user))
        .route("/users/c/:username", get(handlers::user::channel_profile))
        .route(
            "/users/update-account",
            patch(handlers::user::update_account),
        )
        .route("/users/avatar", patch(handlers::user::update_avatar))
        .route(
            "/users/cover-image",
            patch(handlers::user::update_cover_image),
        )
        .route(
            "/videos",
            post(handlers::videos::publish_video).get(handlers::videos::list_videos),
        )
        .route(
            "/videos/:id",
            get(handlers::videos::get_video)
                .patch(handlers::videos::update_video)
                .delete(handlers::videos::delete_video),
        )
        .route(
            "/videos/toggle/publish/:id",
            patch(handlers::videos::toggle_publish),
        )
        .route(
            "/comments/:video_id",
            get(handlers::comments::list_comments).post(handlers::comments::add_comment),
        )
        .route(
            "/comments/c/:comment_id",
            patch(handlers::comments::update_comment).delete(handlers::comments::delete_comment),
        )
        .route("/tweets", post(handlers::tweets::create_tweet))
        .route("/tweets/user/:user_id", get(handlers::tweets::list_tweets))
        .route(
            "/tweets/:id",
            patch(handlers::tweets::update_tweet).delete(handlers::tweets::delete_tweet),
        )
        .route("/playlists", post(handlers::playlists::create_playlist))
        .route(
            "/playlists/user/:user_id",
            get(handlers::playlists::list_playlists),
        )
        .route(
            "/playlists/:id",
            get(handlers::playlists::get_playlist)
                .patch(handlers::playlists::update_playlist)
                .delete(handlers::playlists::delete_playlist),
        )
        .route(
            "/playlists/add/:video_id/:playlist_id",
            patch(handlers::playlists::add_video),
        )
        .route(
            "/playlists/remove/:video_id/:playlist_id",
            patch(handlers::playlists::remove_video),
        )
        .route("/likes/videos", get(handlers::likes::liked_videos))
        .route("/likes/:kind/:id", post(handlers::likes::toggle_like))
        .route(
            "/subscriptions/:channel_id",
            post(handlers::subscriptions::toggle_subscription),
        )
        .route(
            "/subscriptions/c/:channel_id",
            get(handlers::subscriptions::channel_subscribers),
        )
        .route(
            "/subscriptions/u/:subscriber_id",
            get(handlers::subscriptions::subscribed_channels),
        )
        .route("/dashboard/stats", get(handlers::dashboard::channel_stats))
        .route("/dashboard/videos", get(handlers::dashboard::channel_videos))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .nest("/api/v1", public.merge(protected));

    let swagger_enabled = match state.config.environment {
        Environment::Dev => true,
        Environment::Prod => state.config.swagger.enabled == SwaggerMode::Public,
    };

    if swagger_enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    app.with_state(state.clone())
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security))
}

/// Cookies need credentialed CORS, which cannot be combined with a wildcard
/// origin; `*` therefore yields a credential-less layer.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if security.allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = security
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    base.allow_origin(origins).allow_credentials(true)
}
