mod claim;
mod lease;
mod slots;

pub use claim::*;
pub use lease::*;
pub use slots::*;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::config::RateLimitConfig;
use crate::rate_limit;
use crate::store::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(rate: RateLimitConfig) -> Router<AppState> {
    let standard = Router::new()
        .route("/slots", get(list_slots))
        .route("/claim", post(claim_code))
        .route("/lease/{code}", get(view_lease))
        .route("/lease/{code}/refresh", post(refresh_lease))
        .route("/lease/{code}/otp", get(lease_otp))
        .layer(rate_limit::standard_layer(rate.standard_rpm));

    // The external-code path fans out to a scarce upstream channel; it gets
    // its own, tighter budget.
    let strict = Router::new()
        .route("/lease/{code}/mailcode", post(lease_mail_code))
        .layer(rate_limit::strict_layer(rate.strict_rpm));

    Router::new()
        .route("/health", get(health))
        .merge(standard)
        .merge(strict)
}
