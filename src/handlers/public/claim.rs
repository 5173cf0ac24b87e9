use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::engine;
use crate::engine::lease::LeaseView;
use crate::error::Result;
use crate::extractors::Json;
use crate::store::AppState;

/// Request body for POST /claim
#[derive(Debug, Deserialize)]
pub struct ClaimBody {
    pub code: String,
    /// Identity of the consumer redeeming the code.
    pub consumer: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    /// False when the claim stood but no eligible credential existed.
    pub assigned: bool,
    pub lease: LeaseView,
}

/// POST /claim - Redeem a code and receive (or rejoin) its lease.
pub async fn claim_code(
    State(state): State<AppState>,
    Json(body): Json<ClaimBody>,
) -> Result<Json<ClaimResponse>> {
    let now = Utc::now().timestamp();
    let outcome = engine::claim(&state.db, &body.code, &body.consumer, now).await?;

    let conn = state.db.get()?;
    let assigned = matches!(outcome.assignment, engine::Assignment::Bound { .. });
    let lease = engine::lease::project(&conn, outcome.lease)?;

    Ok(Json(ClaimResponse { assigned, lease }))
}
