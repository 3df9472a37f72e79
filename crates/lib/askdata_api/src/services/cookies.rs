//! Cookie service: set/clear httpOnly auth cookies.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::CookieConfig;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

fn build(config: &CookieConfig, name: &str, value: &str, max_age: Duration) -> Cookie<'static> {
    let mut builder = Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(max_age);
    if let Some(domain) = &config.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

/// Build a httpOnly cookie for the access token.
pub fn access_cookie(config: &CookieConfig, token: &str, max_age_secs: i64) -> Cookie<'static> {
    build(config, ACCESS_COOKIE, token, Duration::seconds(max_age_secs))
}

/// Build a httpOnly cookie for the refresh token.
pub fn refresh_cookie(config: &CookieConfig, token: &str, max_age_secs: i64) -> Cookie<'static> {
    build(config, REFRESH_COOKIE, token, Duration::seconds(max_age_secs))
}

/// Build an expired cookie to clear the access token.
pub fn clear_access_cookie(config: &CookieConfig) -> Cookie<'static> {
    build(config, ACCESS_COOKIE, "", Duration::ZERO)
}

/// Build an expired cookie to clear the refresh token.
pub fn clear_refresh_cookie(config: &CookieConfig) -> Cookie<'static> {
    build(config, REFRESH_COOKIE, "", Duration::ZERO)
}
