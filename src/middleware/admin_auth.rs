//! Shared-secret authentication for the administrative surface.
//!
//! Admins present the secret in an `x-admin-key` header; the comparison is
//! exact-match, constant-time. The engine itself never sees the secret —
//! authorization happens entirely at this boundary.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::store::AppState;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided.is_empty()
        || provided
            .as_bytes()
            .ct_eq(state.admin_key.as_bytes())
            .unwrap_u8()
            == 0
    {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
