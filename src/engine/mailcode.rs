//! Externally-delivered code retrieval behind a per-platform busy window.
//!
//! The delivery channel is scarce and rate-limited upstream, so at most one
//! fetch per platform may be in flight. The window is a timestamp marker in
//! the store rather than a process lock: it survives a vanished caller and
//! releases itself after the hold duration.

use std::time::Duration;

use rusqlite::Connection;
use serde_json::json;

use crate::error::{msg, AppError, Result};
use crate::mail::{Delivery, MailClient};
use crate::models::MailWindow;
use crate::store::{kv, records, DbPool};

use super::lease;

/// How long an in-flight fetch holds the platform window.
pub const WINDOW_HOLD_SECS: i64 = 90;

/// Lookup attempts against the delivery collaborator per fetch.
pub const POLL_ATTEMPTS: u32 = 3;

/// Try to take the platform window at `now`. Returns false while another
/// fetch holds it.
pub fn try_acquire_window(conn: &Connection, platform: &str, now: i64) -> Result<bool> {
    let key = records::maillock_key(platform);
    if let Some(window) = kv::get::<MailWindow>(conn, &key)? {
        if window.busy_until > now {
            return Ok(false);
        }
    }
    kv::put(
        conn,
        &key,
        &MailWindow {
            busy_until: now + WINDOW_HOLD_SECS,
        },
    )?;
    Ok(true)
}

pub fn release_window(conn: &Connection, platform: &str) -> Result<()> {
    kv::delete(conn, &records::maillock_key(platform))?;
    Ok(())
}

/// Fetch the externally-delivered code for a lease's bound credential.
pub async fn fetch_mail_code(
    db: &DbPool,
    mail: &MailClient,
    code: &str,
    now: i64,
) -> Result<String> {
    let (platform, recipient) = {
        let conn = db.get()?;
        let lease = lease::load_active(&conn, code, now)?;
        let cred_id = lease
            .credential_id
            .as_deref()
            .ok_or(AppError::NoResourceBound)?;
        let cred =
            records::get_credential(&conn, cred_id)?.ok_or(AppError::ResourceNotFound)?;
        let recipient = cred
            .payload
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest(msg::NO_MAIL_ADDRESS.into()))?
            .to_string();

        let platform = match lease.platform.trim() {
            "" => "default".to_string(),
            p => p.to_string(),
        };
        if !try_acquire_window(&conn, &platform, now)? {
            return Err(AppError::Busy);
        }
        (platform, recipient)
    };

    let result = poll_delivery(mail, &recipient, &platform).await;

    {
        let conn = db.get()?;
        // The window clears no matter how the poll ended.
        if let Err(e) = release_window(&conn, &platform) {
            tracing::warn!("Failed to release fetch window for {}: {}", platform, e);
        }
        if result.is_ok() {
            let mut fields = serde_json::Map::new();
            fields.insert("mail_code_delivered".into(), json!(true));
            if let Err(e) = records::patch_lease(&conn, code, fields) {
                tracing::warn!("Failed to flag mail delivery on lease {}: {}", code, e);
            }
        }
    }

    result
}

/// Poll the collaborator while it reports "not found", with increasing
/// backoff. Success and unexpected statuses stop immediately.
async fn poll_delivery(mail: &MailClient, recipient: &str, platform: &str) -> Result<String> {
    for attempt in 1..=POLL_ATTEMPTS {
        match mail.lookup(recipient, platform).await? {
            Delivery::Success { code } => return Ok(code),
            Delivery::NotFound => {
                if attempt < POLL_ATTEMPTS {
                    tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                }
            }
            Delivery::Other(status) => {
                return Err(AppError::Internal(format!(
                    "Unexpected delivery status: {}",
                    status
                )));
            }
        }
    }
    Err(AppError::NotFound("No delivered code found".into()))
}
