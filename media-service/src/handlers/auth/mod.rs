pub mod password;
pub mod registration;
pub mod session;

pub use password::change_password;
pub use registration::register;
pub use session::{login, logout, refresh_token};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::dtos::auth::TokenResponse;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

/// Attach both tokens of a pair as cookies.
pub(crate) fn with_session_cookies(jar: CookieJar, tokens: &TokenResponse) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone()))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone()))
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new());
    cookie.make_removal();
    cookie
}

/// Overwrite both cookies with expired, empty ones. A jar removal emits
/// nothing for cookies the request did not carry.
pub(crate) fn without_session_cookies(jar: CookieJar) -> CookieJar {
    jar.add(expired_cookie(ACCESS_TOKEN_COOKIE))
        .add(expired_cookie(REFRESH_TOKEN_COOKIE))
}
