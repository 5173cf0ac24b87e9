use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::slot::LabelMode;

/// The binding of a consumer to a credential for a bounded time window.
///
/// Keyed by the redemption code that created it and created exactly once per
/// code; after `end_time` passes every mutating operation fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub code: String,
    pub consumer: String,
    #[serde(default)]
    pub platform: String,
    pub slot_id: String,
    pub slot_name: String,
    pub label_mode: LabelMode,
    pub headline: String,
    /// Local wall-clock, second precision.
    pub start_time: String,
    pub end_time: String,
    /// Machine-sortable creation instant (unix seconds).
    pub created_at: i64,
    /// None until assignment succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
    /// Snapshot of the bound credential's payload at last refresh.
    #[serde(default)]
    pub payload: serde_json::Map<String, Value>,
    /// Administrative soft-delete.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub totp_delivered: bool,
    #[serde(default)]
    pub mail_code_delivered: bool,
}

/// Per-platform capability flags controlling which auxiliary lease actions
/// are offered. Unconfigured platforms allow refresh only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlatformFeatures {
    #[serde(default = "flag_on")]
    pub refresh: bool,
    #[serde(default)]
    pub totp: bool,
    #[serde(default)]
    pub mail_code: bool,
    #[serde(default)]
    pub invite: bool,
}

fn flag_on() -> bool {
    true
}

impl Default for PlatformFeatures {
    fn default() -> Self {
        Self {
            refresh: true,
            totp: false,
            mail_code: false,
            invite: false,
        }
    }
}

/// Busy-until marker guarding the external-code channel for one platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MailWindow {
    pub busy_until: i64,
}
