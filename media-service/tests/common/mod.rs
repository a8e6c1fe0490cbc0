#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use media_service::{
    build_router,
    config::{
        Environment, JwtConfig, MediaConfig, MongoConfig, SecurityConfig, SwaggerConfig,
        SwaggerMode, UploadConfig,
    },
    services::{MockUploader, Store},
    AppState,
};
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "pw1";
const BOUNDARY: &str = "media-test-boundary";

/// Full router over the in-memory store and a mock media host.
pub struct TestApp {
    pub router: Router,
    pub store: Store,
    pub uploader: Arc<MockUploader>,
    pub config: MediaConfig,
    _upload_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Value of a `Set-Cookie` header for `name`, with its attributes.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&prefix))
            .map(str::to_string)
    }

    pub fn cookie_value(&self, name: &str) -> Option<String> {
        self.set_cookie(name).map(|c| {
            c.split(';')
                .next()
                .unwrap_or_default()
                .split_once('=')
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        })
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// Tokens and id of a logged-in user.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn test_config(upload_dir: &TempDir) -> MediaConfig {
    MediaConfig {
        common: CoreConfig::default(),
        environment: Environment::Dev,
        service_name: "media-service-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        mongodb: MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "media_test".to_string(),
        },
        jwt: JwtConfig {
            access_token_secret: "test-access-secret-0123456789abcdef".to_string(),
            refresh_token_secret: "test-refresh-secret-0123456789abcdef".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 10,
        },
        upload: UploadConfig {
            url: "http://media.test/upload".to_string(),
            api_key: "test-key".to_string(),
            tmp_dir: upload_dir.path().to_path_buf(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
    }
}

impl TestApp {
    pub fn new() -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = test_config(&upload_dir);
        let store = Store::in_memory();
        let uploader = Arc::new(MockUploader::new());

        let state = AppState::new(config.clone(), store.clone(), uploader.clone());
        TestApp {
            router: build_router(state),
            store,
            uploader,
            config,
            _upload_dir: upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Option<Value>) -> TestResponse {
        self.request(Method::PATCH, uri, Some(token), body).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn register(&self, username: &str, password: &str) -> TestResponse {
        self.post(
            "/api/v1/users/register",
            None,
            json!({
                "full_name": format!("{} Example", username),
                "username": username,
                "email": format!("{}@example.com", username),
                "password": password,
            }),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.post(
            "/api/v1/users/login",
            None,
            json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Register and log in with [`PASSWORD`].
    pub async fn signed_in(&self, username: &str) -> Session {
        assert_eq!(self.register(username, PASSWORD).await.status, StatusCode::CREATED);
        let res = self.login(username, PASSWORD).await;
        assert_eq!(res.status, StatusCode::OK);
        Session {
            user_id: res.body["user"]["id"].as_str().unwrap().to_string(),
            access_token: res.body["access_token"].as_str().unwrap().to_string(),
            refresh_token: res.body["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    /// Send a multipart request. `files` are `(field, file name, bytes)`.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> TestResponse {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        for (name, file_name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    BOUNDARY, name, file_name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Publish a video owned by `session` and return its id.
    pub async fn publish_video(&self, session: &Session, title: &str) -> String {
        let res = self
            .multipart(
                Method::POST,
                "/api/v1/videos",
                &session.access_token,
                &[("title", title), ("description", "a test video")],
                &[
                    ("videoFile", "clip.mp4", &b"video-bytes"[..]),
                    ("thumbnail", "thumb.png", &b"png-bytes"[..]),
                ],
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
        res.body["_id"].as_str().unwrap().to_string()
    }
}
