//! Test utilities and fixtures for keylease integration tests

#![allow(dead_code)]

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::json;

pub use keylease::engine;
pub use keylease::error::AppError;
pub use keylease::models::*;
pub use keylease::store::{init_db, kv, records, DbPool};

/// Single-connection in-memory store (sqlite `:memory:` is per-connection,
/// so the pool must never hand out a second one).
pub fn memory_pool() -> DbPool {
    let pool = Pool::builder()
        .max_size(1)
        .build(SqliteConnectionManager::memory())
        .expect("Failed to build in-memory pool");
    init_db(&pool.get().unwrap()).expect("Failed to initialize schema");
    pool
}

/// File-backed store sharing one database across many connections, for
/// tests that race concurrent claimants.
pub fn file_pool(path: &Path) -> DbPool {
    let pool = keylease::store::create_pool(path.to_str().expect("db path not utf-8"))
        .expect("Failed to build file pool");
    init_db(&pool.get().unwrap()).expect("Failed to initialize schema");
    pool
}

/// Create a test slot with default values.
pub fn create_test_slot(db: &DbPool, id: &str, platform: &str, duration: SlotDuration) -> Slot {
    let slot = Slot {
        id: id.to_string(),
        name: capitalize(id),
        platform: platform.to_string(),
        required_amount: 1,
        enabled: true,
        duration,
        label_mode: None,
    };
    records::put_slot(&db.get().unwrap(), &slot).expect("Failed to create test slot");
    slot
}

/// Create a test credential serving the given slot ids / platform tags.
pub fn create_test_credential(
    db: &DbPool,
    id: &str,
    slots: serde_json::Value,
    platforms: serde_json::Value,
) -> Credential {
    let cred: Credential = serde_json::from_value(json!({
        "id": id,
        "slots": slots,
        "platforms": platforms,
        "payload": {
            "username": format!("{}@pool.test", id),
            "password": "hunter2",
        },
    }))
    .expect("Failed to build test credential");
    records::put_credential(&db.get().unwrap(), &cred).expect("Failed to create test credential");
    cred
}

/// Create a test redemption code for a slot.
pub fn create_test_code(db: &DbPool, code: &str, slot_id: &str, max_uses: i64) -> RedemptionCode {
    let record = RedemptionCode {
        code: code.to_string(),
        slot_id: slot_id.to_string(),
        created_by: "test".to_string(),
        created_at: now(),
        expires_at: None,
        max_uses,
        used: 0,
        revoked: false,
        last_used_by: None,
        last_used_at: None,
        uses: Vec::new(),
    };
    records::put_code(&db.get().unwrap(), &record).expect("Failed to create test code");
    record
}

/// Get the current timestamp
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
