//! Authentication middleware: bearer header or cookie, verified as an
//! access token.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::ACCESS_COOKIE;
use crate::services::credentials::presented_token;

/// Authorized subject, stored in request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedPrincipal(pub Uuid);

/// Axum middleware: resolves the presented access token and injects
/// `AuthenticatedPrincipal` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = presented_token(request.headers(), &jar, ACCESS_COOKIE);
    let subject = state.session.authorize(token.as_deref())?;

    request
        .extensions_mut()
        .insert(AuthenticatedPrincipal(subject));

    Ok(next.run(request).await)
}
