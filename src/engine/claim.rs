//! The redemption state machine.
//!
//! Claiming validates the code, consumes one use under the optimistic retry
//! protocol, creates the lease (once per code, ever), then asks the selector
//! for a credential to bind. An empty pool is not a failure: the claim
//! stands and the lease is returned unbound.

use serde_json::{json, Value};

use crate::clock;
use crate::error::{AppError, Result};
use crate::id;
use crate::models::{CodeUse, Credential, LabelMode, Lease, RedemptionCode, Slot};
use crate::store::{records, DbPool};

use super::retry::{self, Attempt, RetryPolicy};
use super::select;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Bound { credential_id: String },
    /// Claimed successfully but no eligible credential existed.
    Unbound,
}

#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub lease: Lease,
    pub assignment: Assignment,
}

/// Redeem `code` for `consumer` at `now` (unix seconds).
pub async fn claim(db: &DbPool, code: &str, consumer: &str, now: i64) -> Result<ClaimOutcome> {
    let code = code.trim().to_uppercase();
    let consumer = consumer.trim().to_string();
    if consumer.is_empty() {
        return Err(AppError::BadRequest("Consumer identity required".into()));
    }
    if !id::is_valid_code(&code) {
        return Err(AppError::NotFound(crate::error::msg::CODE_NOT_FOUND.into()));
    }

    let record = consume_use(db, &code, &consumer, now).await?;

    let conn = db.get()?;
    let slot = records::get_slot(&conn, &record.slot_id)?
        .ok_or_else(|| AppError::Internal(format!("Slot {} missing for code", record.slot_id)))?;

    // The lease is created exactly once per code; later uses of a multi-use
    // code join the same lease.
    let mut lease = match records::get_lease(&conn, &code)? {
        Some(existing) => existing,
        None => {
            let lease = build_lease(&conn, &code, &consumer, &slot, now)?;
            if records::create_lease(&conn, &lease)? {
                lease
            } else {
                // Lost the creation race to a concurrent winner of another use.
                records::get_lease(&conn, &code)?.ok_or_else(|| {
                    AppError::Internal(format!("Lease for {} vanished after creation race", code))
                })?
            }
        }
    };

    let assignment = if let Some(credential_id) = lease.credential_id.clone() {
        Assignment::Bound { credential_id }
    } else {
        match select::select_credential(&conn, &slot, now)? {
            Some(cred) => {
                bind_credential(&conn, &mut lease, &cred)?;
                Assignment::Bound {
                    credential_id: cred.id,
                }
            }
            None => Assignment::Unbound,
        }
    };

    Ok(ClaimOutcome { lease, assignment })
}

/// Consume one use of the code under the compare-and-retry protocol.
///
/// Each attempt re-reads the record, re-checks the preconditions, takes a
/// use receipt, writes the incremented counter plus the use-log entry, then
/// re-reads to confirm the count reflects the increment. Two claimants that
/// read the same base count write the same incremented value, so the count
/// alone cannot split that tie — ownership of use number `expected` is
/// arbitrated by an atomic create-if-absent receipt key instead. Losing the
/// receipt means retrying from a fresh read.
async fn consume_use(
    db: &DbPool,
    code: &str,
    consumer: &str,
    now: i64,
) -> Result<RedemptionCode> {
    retry::run(db, &RetryPolicy::default(), |conn| {
        let record = records::get_code(conn, code)?
            .ok_or_else(|| AppError::NotFound(crate::error::msg::CODE_NOT_FOUND.into()))?;

        if record.revoked {
            return Err(AppError::Revoked);
        }
        if let Some(expires_at) = record.expires_at {
            if now > expires_at {
                return Err(AppError::Expired);
            }
        }
        if record.used >= record.max_uses {
            return Err(AppError::UsedUp);
        }

        let expected = record.used + 1;
        let receipt = CodeUse {
            by: consumer.to_string(),
            at: now,
        };

        if !records::claim_use_receipt(conn, code, expected, &receipt)? {
            match records::get_use_receipt(conn, code, expected)? {
                // Ours from an earlier attempt whose counter write failed.
                Some(existing) if existing == receipt => {}
                _ => return Ok(Attempt::RaceLost),
            }
        }

        let mut uses = record.uses.clone();
        uses.push(receipt);

        let mut fields = serde_json::Map::new();
        fields.insert("used".into(), json!(expected));
        fields.insert("last_used_by".into(), json!(consumer));
        fields.insert("last_used_at".into(), json!(now));
        fields.insert("uses".into(), serde_json::to_value(&uses)?);

        match records::patch_code(conn, code, fields) {
            Ok(true) => {}
            Ok(false) => return Ok(Attempt::WriteFailed),
            Err(e) => {
                tracing::warn!("Claim write for {} failed: {}", code, e);
                return Ok(Attempt::WriteFailed);
            }
        }

        // Post-write confirmation. Later winners may already have advanced
        // the count past ours; what matters is that the increment landed and
        // our log entry survived the merge.
        let after = match records::get_code(conn, code)? {
            Some(after) => after,
            None => return Ok(Attempt::WriteFailed),
        };
        let logged = after.uses.iter().any(|u| u.by == consumer && u.at == now);
        if after.used >= expected && logged {
            Ok(Attempt::Won(after))
        } else {
            Ok(Attempt::WriteFailed)
        }
    })
    .await
}

fn build_lease(
    conn: &rusqlite::Connection,
    code: &str,
    consumer: &str,
    slot: &Slot,
    now: i64,
) -> Result<Lease> {
    let hours = slot.duration.hours();
    let label_mode = resolve_label_mode(conn, slot)?;
    let headline = headline(label_mode, slot);

    Ok(Lease {
        code: code.to_string(),
        consumer: consumer.to_string(),
        platform: slot.platform.trim().to_string(),
        slot_id: slot.id.clone(),
        slot_name: slot.name.clone(),
        label_mode,
        headline,
        start_time: clock::format_local(now),
        end_time: clock::format_local(now + hours * 3600),
        created_at: now,
        credential_id: None,
        payload: serde_json::Map::new(),
        hidden: false,
        totp_delivered: false,
        mail_code_delivered: false,
    })
}

/// Resolution order: the slot's own mode, the scoped config flag, then the
/// legacy boolean, then "name".
fn resolve_label_mode(conn: &rusqlite::Connection, slot: &Slot) -> Result<LabelMode> {
    if let Some(mode) = slot.label_mode.as_deref().and_then(LabelMode::parse) {
        return Ok(mode);
    }
    if let Some(value) = records::get_config_string(conn, "approve_flow_label_mode")? {
        if let Some(mode) = LabelMode::parse(&value) {
            return Ok(mode);
        }
    }
    Ok(
        match records::get_config_bool(conn, "use_platform_label")? {
            Some(true) => LabelMode::Platform,
            _ => LabelMode::Name,
        },
    )
}

fn headline(mode: LabelMode, slot: &Slot) -> String {
    match mode {
        LabelMode::Platform if !slot.platform.trim().is_empty() => {
            format!("{} Account", slot.platform.trim())
        }
        _ => format!("{} Account", slot.name),
    }
}

/// Bind a selected credential to the lease: reference, payload snapshot and
/// a best-effort usage bump. Two concurrent binds to the same credential can
/// both pass the eligibility check before either increments; that narrow
/// race is tolerated rather than routed through the retry protocol.
fn bind_credential(
    conn: &rusqlite::Connection,
    lease: &mut Lease,
    cred: &Credential,
) -> Result<()> {
    let mut fields = serde_json::Map::new();
    fields.insert("credential_id".into(), json!(cred.id));
    fields.insert("payload".into(), Value::Object(cred.payload.clone()));
    records::patch_lease(conn, &lease.code, fields)?;

    lease.credential_id = Some(cred.id.clone());
    lease.payload = cred.payload.clone();

    if cred.max_usage == 0 || cred.usage_count < cred.max_usage {
        let mut bump = serde_json::Map::new();
        bump.insert("usage_count".into(), json!(cred.usage_count + 1));
        if let Err(e) = records::patch_credential(conn, &cred.id, bump) {
            tracing::warn!("Usage bump for credential {} failed: {}", cred.id, e);
        }
    }
    Ok(())
}
