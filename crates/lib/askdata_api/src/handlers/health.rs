//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /healthz`
pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}
