//! Lease lifecycle: view, refresh-on-change and the time-window code path.
//!
//! Every operation re-checks the lease window first; past `end_time` a lease
//! is read-only and all of these fail `Expired`.

use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};

use crate::clock;
use crate::error::{msg, AppError, OptionExt, Result};
use crate::models::{Credential, LabelMode, Lease, PlatformFeatures};
use crate::store::records;
use crate::totp;

/// Load a lease and enforce the hidden/expired invariants.
pub fn load_active(conn: &Connection, code: &str, now: i64) -> Result<Lease> {
    let lease = records::get_lease(conn, code)?.or_not_found(msg::LEASE_NOT_FOUND)?;
    if lease.hidden {
        return Err(AppError::Hidden);
    }
    if clock::is_past(&lease.end_time, now) {
        return Err(AppError::Expired);
    }
    Ok(lease)
}

/// Client-facing projection of a lease.
#[derive(Debug, Clone, Serialize)]
pub struct LeaseView {
    pub code: String,
    pub headline: String,
    pub platform: String,
    pub slot_id: String,
    pub slot_name: String,
    pub label_mode: LabelMode,
    pub start_time: String,
    pub end_time: String,
    pub assigned: bool,
    pub payload: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_url: Option<String>,
    pub features: PlatformFeatures,
    pub totp_delivered: bool,
    pub mail_code_delivered: bool,
}

pub fn view(conn: &Connection, code: &str, now: i64) -> Result<LeaseView> {
    let lease = load_active(conn, code, now)?;
    project(conn, lease)
}

/// Project a lease the caller already holds (no hidden/expired gating —
/// `view` applies that first).
pub fn project(conn: &Connection, lease: Lease) -> Result<LeaseView> {
    let features = records::get_platform_features(conn, &lease.platform)?;

    // Invite link: the lease's own snapshot first, then the bound credential.
    let mut invite_url = payload_str(&lease.payload, "invite_url");
    if invite_url.is_none() {
        if let Some(cred_id) = &lease.credential_id {
            if let Some(cred) = records::get_credential(conn, cred_id)? {
                invite_url = payload_str(&cred.payload, "invite_url");
            }
        }
    }

    Ok(LeaseView {
        code: lease.code,
        headline: lease.headline,
        platform: lease.platform,
        slot_id: lease.slot_id,
        slot_name: lease.slot_name,
        label_mode: lease.label_mode,
        start_time: lease.start_time,
        end_time: lease.end_time,
        assigned: lease.credential_id.is_some(),
        payload: lease.payload,
        invite_url,
        features,
        totp_delivered: lease.totp_delivered,
        mail_code_delivered: lease.mail_code_delivered,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
    /// Payload matches the stored snapshot; nothing written.
    Unchanged,
    Updated(serde_json::Map<String, Value>),
}

/// Re-read the bound credential and sync the lease's payload snapshot.
pub fn refresh(conn: &Connection, code: &str, now: i64) -> Result<Refresh> {
    let lease = load_active(conn, code, now)?;
    let cred = bound_credential(conn, &lease)?;

    if cred.payload == lease.payload {
        return Ok(Refresh::Unchanged);
    }

    let mut fields = serde_json::Map::new();
    fields.insert("payload".into(), Value::Object(cred.payload.clone()));
    records::patch_lease(conn, code, fields)?;
    Ok(Refresh::Updated(cred.payload))
}

/// Produce the current time-window code from the bound credential's seed.
pub fn time_code(conn: &Connection, code: &str, now: i64) -> Result<totp::TimeCode> {
    let lease = load_active(conn, code, now)?;
    let cred = bound_credential(conn, &lease)?;

    let seed = payload_str(&cred.payload, "otp_secret")
        .ok_or_else(|| AppError::BadRequest(msg::NO_OTP_SEED.into()))?;
    let tc = totp::generate(&seed, now)?;

    if !lease.totp_delivered {
        let mut fields = serde_json::Map::new();
        fields.insert("totp_delivered".into(), json!(true));
        records::patch_lease(conn, code, fields)?;
    }
    Ok(tc)
}

fn bound_credential(conn: &Connection, lease: &Lease) -> Result<Credential> {
    let cred_id = lease
        .credential_id
        .as_deref()
        .ok_or(AppError::NoResourceBound)?;
    records::get_credential(conn, cred_id)?.ok_or(AppError::ResourceNotFound)
}

fn payload_str(payload: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
