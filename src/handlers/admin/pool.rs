use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{msg, OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::{Credential, Lease, OwnerSet, Slot, SlotDuration};
use crate::store::{records, AppState};

/// GET /admin/slots - All slots, disabled included.
pub async fn list_all_slots(State(state): State<AppState>) -> Result<Json<Vec<Slot>>> {
    let conn = state.db.get()?;
    Ok(Json(records::list_slots(&conn)?))
}

#[derive(Debug, Deserialize)]
pub struct UpsertSlot {
    pub name: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub required_amount: i64,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub duration: SlotDuration,
    #[serde(default)]
    pub label_mode: Option<String>,
}

fn enabled_default() -> bool {
    true
}

/// PUT /admin/slots/{id} - Create or replace a slot definition.
pub async fn upsert_slot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpsertSlot>,
) -> Result<Json<Slot>> {
    let conn = state.db.get()?;
    let slot = Slot {
        id: id.trim().to_lowercase(),
        name: body.name,
        platform: body.platform,
        required_amount: body.required_amount,
        enabled: body.enabled,
        duration: body.duration,
        label_mode: body.label_mode,
    };
    records::put_slot(&conn, &slot)?;
    Ok(Json(slot))
}

#[derive(Debug, Deserialize)]
pub struct UpsertCredential {
    #[serde(default)]
    pub slots: OwnerSet,
    #[serde(default)]
    pub platforms: OwnerSet,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub usage_count: i64,
    #[serde(default)]
    pub max_usage: i64,
    #[serde(default)]
    pub expires_on: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Map<String, Value>,
}

/// PUT /admin/credentials/{id} - Create or replace a pool credential.
pub async fn upsert_credential(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpsertCredential>,
) -> Result<Json<Credential>> {
    let conn = state.db.get()?;
    let cred = Credential {
        id: id.trim().to_string(),
        slots: body.slots,
        platforms: body.platforms,
        locked: body.locked,
        usage_count: body.usage_count,
        max_usage: body.max_usage,
        expires_on: body.expires_on,
        payload: body.payload,
    };
    records::put_credential(&conn, &cred)?;
    Ok(Json(cred))
}

#[derive(Debug, Deserialize, Default)]
pub struct LockBody {
    /// Defaults to locking; pass false to unlock.
    #[serde(default)]
    pub locked: Option<bool>,
}

/// POST /admin/credentials/{id}/lock - Lock or unlock a credential.
pub async fn lock_credential(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<LockBody>,
) -> Result<Json<Credential>> {
    let conn = state.db.get()?;
    records::get_credential(&conn, &id)?.or_not_found(msg::CREDENTIAL_NOT_FOUND)?;

    let mut fields = serde_json::Map::new();
    fields.insert("locked".into(), json!(body.locked.unwrap_or(true)));
    records::patch_credential(&conn, &id, fields)?;

    let cred = records::get_credential(&conn, &id)?.or_not_found(msg::CREDENTIAL_NOT_FOUND)?;
    Ok(Json(cred))
}

/// POST /admin/leases/{code}/hide - Soft-delete a lease from client view.
pub async fn hide_lease(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Lease>> {
    let conn = state.db.get()?;
    let code = code.trim().to_uppercase();
    records::get_lease(&conn, &code)?.or_not_found(msg::LEASE_NOT_FOUND)?;

    let mut fields = serde_json::Map::new();
    fields.insert("hidden".into(), json!(true));
    records::patch_lease(&conn, &code, fields)?;

    let lease = records::get_lease(&conn, &code)?.or_not_found(msg::LEASE_NOT_FOUND)?;
    Ok(Json(lease))
}
