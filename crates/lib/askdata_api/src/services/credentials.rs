//! Locating the presented credential on a request.
//!
//! Fixed order: `Authorization: Bearer <token>` first, then the named cookie.
//! Refresh is the one exception: a header token that is not a refresh token
//! yields to the refresh cookie when one is present.

use askdata_core::auth::jwt::TokenCodec;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum_extra::extract::cookie::CookieJar;

/// Token from a `Bearer` authorization header, if one is present.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim().to_string()).filter(|t| !t.is_empty())
}

fn cookie_token(jar: &CookieJar, cookie: &str) -> Option<String> {
    jar.get(cookie)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Header token if present, else the value of `cookie`.
pub fn presented_token(headers: &HeaderMap, jar: &CookieJar, cookie: &str) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(jar, cookie))
}

/// Refresh token for `/auth/refresh`.
///
/// Browsers that attach their access token as a bearer header on every call
/// still refresh through the cookie: a header token that does not verify as a
/// refresh token is skipped when the refresh cookie is set.
pub fn presented_refresh_token(
    headers: &HeaderMap,
    jar: &CookieJar,
    cookie: &str,
    codec: &TokenCodec,
) -> Option<String> {
    let from_cookie = cookie_token(jar, cookie);
    match bearer_token(headers) {
        Some(token) if from_cookie.is_none() || codec.verify_refresh(&token).is_ok() => Some(token),
        _ => from_cookie,
    }
}
