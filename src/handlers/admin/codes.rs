use axum::extract::State;
use chrono::Utc;
use serde_json::json;

use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::id;
use crate::models::{CreateCode, RedemptionCode};
use crate::store::{records, AppState};

/// POST /admin/codes - Issue a redemption code for a slot.
pub async fn create_code(
    State(state): State<AppState>,
    Json(body): Json<CreateCode>,
) -> Result<Json<RedemptionCode>> {
    let conn = state.db.get()?;
    let slot = records::get_slot(&conn, &body.slot_id)?.or_not_found(msg::SLOT_NOT_FOUND)?;

    let max_uses = body.max_uses.unwrap_or(1);
    if max_uses < 1 {
        return Err(AppError::BadRequest("max_uses must be at least 1".into()));
    }

    let code = match body.suffix.as_deref() {
        Some(suffix) => {
            let code = id::code_from_suffix(suffix).ok_or_else(|| {
                AppError::BadRequest(
                    "Suffix must be 4-24 uppercase alphanumeric characters".into(),
                )
            })?;
            if records::code_exists(&conn, &code)? {
                return Err(AppError::BadRequest(format!("Code {} already exists", code)));
            }
            code
        }
        None => {
            // Random suffixes are high-entropy; a couple of regenerations
            // cover the freak collision.
            let mut code = id::new_code();
            for _ in 0..3 {
                if !records::code_exists(&conn, &code)? {
                    break;
                }
                code = id::new_code();
            }
            code
        }
    };

    let record = RedemptionCode {
        code,
        slot_id: slot.id,
        created_by: body.created_by.unwrap_or_else(|| "admin".into()),
        created_at: Utc::now().timestamp(),
        expires_at: body.expires_at,
        max_uses,
        used: 0,
        revoked: false,
        last_used_by: None,
        last_used_at: None,
        uses: Vec::new(),
    };
    records::put_code(&conn, &record)?;

    Ok(Json(record))
}

/// GET /admin/codes/{code} - Full record including the use log.
pub async fn inspect_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RedemptionCode>> {
    let conn = state.db.get()?;
    let record = records::get_code(&conn, &code.trim().to_uppercase())?
        .or_not_found(msg::CODE_NOT_FOUND)?;
    Ok(Json(record))
}

/// POST /admin/codes/{code}/revoke - Revoke a code.
///
/// Revocation is the one mutation allowed on a fully-used code.
pub async fn revoke_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RedemptionCode>> {
    let conn = state.db.get()?;
    let code = code.trim().to_uppercase();
    records::get_code(&conn, &code)?.or_not_found(msg::CODE_NOT_FOUND)?;

    let mut fields = serde_json::Map::new();
    fields.insert("revoked".into(), json!(true));
    records::patch_code(&conn, &code, fields)?;

    let record = records::get_code(&conn, &code)?.or_not_found(msg::CODE_NOT_FOUND)?;
    Ok(Json(record))
}
