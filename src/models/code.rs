use serde::{Deserialize, Serialize};

/// A redeemable code granting access to one slot's credential pool.
///
/// `used` never exceeds `max_uses`; the claim path enforces this with an
/// optimistic write-then-verify loop. After the cap is reached the record is
/// only ever touched again by an administrative revoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionCode {
    pub code: String,
    pub slot_id: String,
    pub created_by: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub max_uses: i64,
    #[serde(default)]
    pub used: i64,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<i64>,
    /// Append-only redemption log.
    #[serde(default)]
    pub uses: Vec<CodeUse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeUse {
    pub by: String,
    pub at: i64,
}

/// Request body for administrative code creation.
#[derive(Debug, Deserialize)]
pub struct CreateCode {
    pub slot_id: String,
    /// Defaults to 1 (single-use).
    #[serde(default)]
    pub max_uses: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Optional custom suffix; a random one is generated when absent.
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}
