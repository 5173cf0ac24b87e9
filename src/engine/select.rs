//! Credential selection for a slot.
//!
//! The pool is prefix-scanned in full and filtered down to eligible
//! candidates, then the best is picked by scope priority: a credential
//! explicitly listing the slot beats one explicitly listing the slot's
//! platform, which beats a universal wildcard. Ties within a tier break
//! lexicographically by credential id, so selection is deterministic for a
//! given pool state.

use rusqlite::Connection;

use crate::clock;
use crate::error::Result;
use crate::models::{Credential, Slot};
use crate::store::records;

/// Scope priority, lower is better.
const TIER_SLOT: u8 = 0;
const TIER_PLATFORM: u8 = 1;
const TIER_UNIVERSAL: u8 = 2;

/// Pick the best eligible credential for `slot`, if any.
pub fn select_credential(conn: &Connection, slot: &Slot, now: i64) -> Result<Option<Credential>> {
    let platform = slot.platform.trim().to_lowercase();

    let mut best: Option<(u8, Credential)> = None;
    for cred in records::list_credentials(conn)? {
        if !eligible(&cred, now) {
            continue;
        }
        let tier = if cred.slots.lists(&slot.id) {
            TIER_SLOT
        } else if !platform.is_empty() && cred.platforms.lists(&platform) {
            TIER_PLATFORM
        } else if cred.slots.is_universal() || cred.platforms.is_universal() {
            TIER_UNIVERSAL
        } else {
            continue;
        };

        best = match best {
            Some((best_tier, best_cred))
                if (best_tier, best_cred.id.as_str()) <= (tier, cred.id.as_str()) =>
            {
                Some((best_tier, best_cred))
            }
            _ => Some((tier, cred)),
        };
    }

    Ok(best.map(|(_, cred)| cred))
}

/// Lock, usage-cap and day-granularity expiry constraints. A credential with
/// an empty payload is skipped too: binding it would produce a lease with
/// nothing to deliver.
fn eligible(cred: &Credential, now: i64) -> bool {
    if cred.locked || cred.at_capacity() {
        return false;
    }
    if let Some(date) = &cred.expires_on {
        if clock::date_expired(date, now) {
            return false;
        }
    }
    !cred.payload.is_empty()
}
