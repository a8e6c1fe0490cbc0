use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::{handlers::auth::ACCESS_TOKEN_COOKIE, services::ServiceError, AppState};

/// Authenticated identity for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub identity_id: String,
    pub username: String,
    pub email: String,
    /// `jti` of the access token presented.
    pub token_id: String,
}

/// Bearer header first, then the access-token cookie.
fn presented_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Middleware to require authentication.
///
/// Every failure yields the same 401 body. Session state is never touched.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = presented_token(req.headers()).ok_or(ServiceError::InvalidToken)?;

    let claims = state.jwt.validate_access_token(&token).map_err(|e| {
        tracing::debug!("Access token rejected: {}", e);
        ServiceError::InvalidToken
    })?;

    req.extensions_mut().insert(RequestContext {
        identity_id: claims.sub,
        username: claims.username,
        email: claims.email,
        token_id: claims.jti,
    });

    Ok(next.run(req).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| ServiceError::InvalidToken.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken=from-cookie"));
        assert_eq!(presented_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=from-cookie"),
        );
        assert_eq!(presented_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_missing_or_malformed_header() {
        assert_eq!(presented_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(presented_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(presented_token(&headers), None);
    }
}
