//! Authentication request handlers.

use askdata_core::models::auth::IssuedCredentials;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::config::CookieConfig;
use crate::error::{AppError, AppResult};
use crate::extract::ClientMeta;
use crate::middleware::auth::AuthenticatedPrincipal;
use crate::models::{LoginRequest, MeResponse, OkResponse, TokenResponse};
use crate::services::cookies::{
    ACCESS_COOKIE, REFRESH_COOKIE, access_cookie, clear_access_cookie, clear_refresh_cookie,
    refresh_cookie,
};
use crate::services::credentials::{presented_refresh_token, presented_token};

/// Put a fresh pair into cookies and build the response body.
fn issue_response(
    config: &CookieConfig,
    jar: CookieJar,
    issued: IssuedCredentials,
) -> (CookieJar, Json<TokenResponse>) {
    let jar = jar
        .add(access_cookie(
            config,
            &issued.access_token,
            issued.access_expires_in,
        ))
        .add(refresh_cookie(
            config,
            &issued.refresh_token,
            issued.refresh_expires_in,
        ));
    let body = TokenResponse {
        ok: true,
        access_token: issued.access_token,
        token_type: "Bearer".into(),
        expires_in: issued.access_expires_in,
    };
    (jar, Json(body))
}

/// `POST /auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let issued = state
        .session
        .login(&body.email, &body.password, client)
        .await?;
    Ok(issue_response(&state.config.cookies, jar, issued))
}

/// `POST /auth/refresh`: exchange the refresh token for a new pair.
///
/// A bearer header carrying a refresh token is honored first; an access token
/// in the header does not shadow the refresh cookie.
pub async fn refresh_handler(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let token = presented_refresh_token(&headers, &jar, REFRESH_COOKIE, state.session.codec())
        .ok_or(AppError::Unauthorized)?;
    let issued = state.session.refresh(&token, client).await?;
    Ok(issue_response(&state.config.cookies, jar, issued))
}

/// `POST /auth/logout`: revoke the caller's sessions and clear cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<OkResponse>)> {
    let token = presented_token(&headers, &jar, ACCESS_COOKIE);
    state.session.logout(token.as_deref()).await?;

    let cookies = &state.config.cookies;
    let jar = jar
        .add(clear_access_cookie(cookies))
        .add(clear_refresh_cookie(cookies));
    Ok((jar, Json(OkResponse { ok: true })))
}

/// `GET /auth/me`: the authorized principal.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedPrincipal(subject)): Extension<AuthenticatedPrincipal>,
) -> AppResult<Json<MeResponse>> {
    let principal = state
        .session
        .principal(&subject)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(MeResponse {
        id: principal.id.to_string(),
        email: principal.email,
        is_admin: principal.is_admin,
    }))
}
