//! Typed accessors and key builders for the record kinds in the store.
//!
//! Key layout:
//!   `code:{CODE}`            redemption codes
//!   `slot:{id}`              slot (category) definitions
//!   `cred:{id}`              credential pool (reserved prefix, prefix-scanned)
//!   `lease:{CODE}`           leases, keyed by the code that created them
//!   `maillock:{platform}`    per-platform external-fetch busy window
//!   `config:{name}`          configuration entries

use rusqlite::Connection;
use serde_json::Value;

use super::kv;
use crate::error::Result;
use crate::models::{Credential, Lease, PlatformFeatures, RedemptionCode, Slot};

pub const CODE_PREFIX: &str = "code:";
pub const SLOT_PREFIX: &str = "slot:";
pub const CRED_PREFIX: &str = "cred:";
pub const LEASE_PREFIX: &str = "lease:";

pub fn code_key(code: &str) -> String {
    format!("{}{}", CODE_PREFIX, code)
}

pub fn slot_key(id: &str) -> String {
    format!("{}{}", SLOT_PREFIX, id)
}

pub fn cred_key(id: &str) -> String {
    format!("{}{}", CRED_PREFIX, id)
}

pub fn lease_key(code: &str) -> String {
    format!("{}{}", LEASE_PREFIX, code)
}

pub fn maillock_key(platform: &str) -> String {
    format!("maillock:{}", platform.trim().to_lowercase())
}

pub fn config_key(name: &str) -> String {
    format!("config:{}", name)
}

// ============ Redemption codes ============

pub fn get_code(conn: &Connection, code: &str) -> Result<Option<RedemptionCode>> {
    kv::get(conn, &code_key(code))
}

pub fn put_code(conn: &Connection, record: &RedemptionCode) -> Result<()> {
    kv::put(conn, &code_key(&record.code), record)
}

pub fn patch_code(
    conn: &Connection,
    code: &str,
    fields: serde_json::Map<String, Value>,
) -> Result<bool> {
    kv::patch(conn, &code_key(code), fields)
}

pub fn code_exists(conn: &Connection, code: &str) -> Result<bool> {
    kv::exists(conn, &code_key(code))
}

/// Key arbitrating ownership of use number `n` of a code.
pub fn use_receipt_key(code: &str, n: i64) -> String {
    format!("codeuse:{}:{}", code, n)
}

/// Atomically take use number `n` of a code. Returns false when another
/// claimant already owns it.
pub fn claim_use_receipt(
    conn: &Connection,
    code: &str,
    n: i64,
    receipt: &crate::models::CodeUse,
) -> Result<bool> {
    kv::put_if_absent(conn, &use_receipt_key(code, n), receipt)
}

pub fn get_use_receipt(
    conn: &Connection,
    code: &str,
    n: i64,
) -> Result<Option<crate::models::CodeUse>> {
    kv::get(conn, &use_receipt_key(code, n))
}

// ============ Slots ============

pub fn get_slot(conn: &Connection, id: &str) -> Result<Option<Slot>> {
    kv::get(conn, &slot_key(id))
}

pub fn put_slot(conn: &Connection, slot: &Slot) -> Result<()> {
    kv::put(conn, &slot_key(&slot.id), slot)
}

pub fn list_slots(conn: &Connection) -> Result<Vec<Slot>> {
    let mut out = Vec::new();
    for (key, value) in kv::list_prefix(conn, SLOT_PREFIX)? {
        match serde_json::from_value::<Slot>(value) {
            Ok(slot) => out.push(slot),
            Err(e) => tracing::warn!("Skipping malformed slot record {}: {}", key, e),
        }
    }
    Ok(out)
}

// ============ Credentials ============

pub fn get_credential(conn: &Connection, id: &str) -> Result<Option<Credential>> {
    kv::get(conn, &cred_key(id))
}

pub fn put_credential(conn: &Connection, cred: &Credential) -> Result<()> {
    kv::put(conn, &cred_key(&cred.id), cred)
}

pub fn patch_credential(
    conn: &Connection,
    id: &str,
    fields: serde_json::Map<String, Value>,
) -> Result<bool> {
    kv::patch(conn, &cred_key(id), fields)
}

/// Load the full credential pool. Malformed pool records are skipped with a
/// warning so one bad entry cannot take selection down.
pub fn list_credentials(conn: &Connection) -> Result<Vec<Credential>> {
    let mut out = Vec::new();
    for (key, value) in kv::list_prefix(conn, CRED_PREFIX)? {
        match serde_json::from_value::<Credential>(value) {
            Ok(cred) => out.push(cred),
            Err(e) => tracing::warn!("Skipping malformed credential record {}: {}", key, e),
        }
    }
    Ok(out)
}

// ============ Leases ============

pub fn get_lease(conn: &Connection, code: &str) -> Result<Option<Lease>> {
    kv::get(conn, &lease_key(code))
}

/// Create a lease only if none exists for its code yet. Leases are created
/// exactly once; concurrent winners of a multi-use code race here and the
/// losers adopt the stored record.
pub fn create_lease(conn: &Connection, lease: &Lease) -> Result<bool> {
    kv::put_if_absent(conn, &lease_key(&lease.code), lease)
}

pub fn patch_lease(
    conn: &Connection,
    code: &str,
    fields: serde_json::Map<String, Value>,
) -> Result<bool> {
    kv::patch(conn, &lease_key(code), fields)
}

// ============ Config entries ============

pub fn get_config_string(conn: &Connection, name: &str) -> Result<Option<String>> {
    Ok(kv::get_raw(conn, &config_key(name))?.and_then(|v| match v {
        Value::String(s) => Some(s),
        _ => None,
    }))
}

pub fn get_config_bool(conn: &Connection, name: &str) -> Result<Option<bool>> {
    Ok(kv::get_raw(conn, &config_key(name))?.and_then(|v| match v {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }))
}

pub fn put_config(conn: &Connection, name: &str, value: &Value) -> Result<()> {
    kv::put(conn, &config_key(name), value)
}

/// Per-platform capability flags, defaulting when unconfigured.
pub fn get_platform_features(conn: &Connection, platform: &str) -> Result<PlatformFeatures> {
    let name = format!("features:{}", platform.trim().to_lowercase());
    Ok(kv::get::<PlatformFeatures>(conn, &config_key(&name))?.unwrap_or_default())
}
