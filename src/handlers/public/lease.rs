use axum::extract::State;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::engine;
use crate::engine::lease::LeaseView;
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::store::AppState;

/// GET /lease/{code} - Current lease projection.
pub async fn view_lease(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LeaseView>> {
    let conn = state.db.get()?;
    let view = engine::view(&conn, &normalize(&code), Utc::now().timestamp())?;
    Ok(Json(view))
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshResponse {
    Unchanged,
    Updated { payload: serde_json::Map<String, Value> },
}

/// POST /lease/{code}/refresh - Sync the payload snapshot from the bound
/// credential.
pub async fn refresh_lease(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RefreshResponse>> {
    let conn = state.db.get()?;
    let response = match engine::refresh(&conn, &normalize(&code), Utc::now().timestamp())? {
        engine::Refresh::Unchanged => RefreshResponse::Unchanged,
        engine::Refresh::Updated(payload) => RefreshResponse::Updated { payload },
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct OtpResponse {
    pub code: String,
    pub seconds_remaining: u64,
}

/// GET /lease/{code}/otp - Time-window code from the bound credential's seed.
pub async fn lease_otp(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<OtpResponse>> {
    let conn = state.db.get()?;
    let tc = engine::time_code(&conn, &normalize(&code), Utc::now().timestamp())?;
    Ok(Json(OtpResponse {
        code: tc.code,
        seconds_remaining: tc.seconds_remaining,
    }))
}

#[derive(Debug, Serialize)]
pub struct MailCodeResponse {
    pub code: String,
}

/// POST /lease/{code}/mailcode - Fetch the externally-delivered code.
pub async fn lease_mail_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<MailCodeResponse>> {
    let code = normalize(&code);
    let delivered = engine::fetch_mail_code(
        &state.db,
        &state.mail,
        &code,
        Utc::now().timestamp(),
    )
    .await?;
    Ok(Json(MailCodeResponse { code: delivered }))
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}
