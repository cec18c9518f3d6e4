use super::ApiState;
use axum::extract::State;
use axum::http::header;
use axum::{Json, response::IntoResponse};
use std::sync::LazyLock;
use std::time::Instant;
use topo_derive::{api_handler, api_model};
use topo_domain::constants::SYSTEM_TAG;

#[api_model]
/// Health check response
pub(super) struct HealthResponse {
    /// Status
    status: String,
    /// Version
    version: String,
    /// Uptime in seconds
    uptime: u64,
    /// Whether bootstrap finished and requests are served
    ready: bool,
}

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

#[api_handler(
    get,
    path = "/health",
    responses((status = OK, description = "Liveness and readiness", body = HealthResponse)),
    tag = SYSTEM_TAG,
)]
pub(super) async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let ready = state.is_ready();
    let body = HealthResponse {
        status: if ready { "up" } else { "starting" }.to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        uptime: START_TIME.elapsed().as_secs(),
        ready,
    };

    (
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(body),
    )
}
