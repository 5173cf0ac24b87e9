//! Redemption engine tests: validation, the optimistic counter, lease
//! construction and concurrent claims.

mod common;

use common::*;
use chrono::TimeZone;
use keylease::engine::Assignment;
use serde_json::json;

#[tokio::test]
async fn test_claim_success_binds_credential() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "acmeflix", SlotDuration::Hours(6));
    let cred = create_test_credential(&db, "c1", json!(["premium"]), json!([]));
    create_test_code(&db, "KLTEST01", "premium", 1);

    let base = now();
    let outcome = engine::claim(&db, "KLTEST01", "user42", base).await.unwrap();

    assert_eq!(
        outcome.assignment,
        Assignment::Bound {
            credential_id: "c1".into()
        }
    );
    let lease = &outcome.lease;
    assert_eq!(lease.code, "KLTEST01");
    assert_eq!(lease.consumer, "user42");
    assert_eq!(lease.slot_id, "premium");
    assert_eq!(lease.platform, "acmeflix");
    assert_eq!(lease.headline, "Premium Account");
    assert_eq!(lease.credential_id.as_deref(), Some("c1"));
    assert_eq!(lease.payload, cred.payload);

    let conn = db.get().unwrap();
    let record = records::get_code(&conn, "KLTEST01").unwrap().unwrap();
    assert_eq!(record.used, 1);
    assert_eq!(record.last_used_by.as_deref(), Some("user42"));
    assert_eq!(record.uses.len(), 1);
    assert_eq!(record.uses[0].by, "user42");

    // best-effort usage bump landed
    let stored_cred = records::get_credential(&conn, "c1").unwrap().unwrap();
    assert_eq!(stored_cred.usage_count, 1);
}

#[tokio::test]
async fn test_claim_normalizes_code_input() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "", SlotDuration::Hours(6));
    create_test_code(&db, "KLTEST01", "premium", 1);

    let outcome = engine::claim(&db, "  kltest01 ", "user42", now()).await.unwrap();
    assert_eq!(outcome.lease.code, "KLTEST01");
}

#[tokio::test]
async fn test_claim_unknown_code_is_not_found() {
    let db = memory_pool();
    let err = engine::claim(&db, "KLMISSING", "user42", now()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // garbage that cannot even be a code never hits the store
    let err = engine::claim(&db, "???", "user42", now()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_claim_revoked_code_fails() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "", SlotDuration::Hours(6));
    let mut record = create_test_code(&db, "KLREVOKED", "premium", 5);
    record.revoked = true;
    records::put_code(&db.get().unwrap(), &record).unwrap();

    let err = engine::claim(&db, "KLREVOKED", "user42", now()).await.unwrap_err();
    assert!(matches!(err, AppError::Revoked));
}

#[tokio::test]
async fn test_claim_expired_code_fails_regardless_of_uses() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "", SlotDuration::Hours(6));
    let mut record = create_test_code(&db, "KLEXPIRED", "premium", 100);
    record.expires_at = Some(now() - 60);
    records::put_code(&db.get().unwrap(), &record).unwrap();

    let err = engine::claim(&db, "KLEXPIRED", "user42", now()).await.unwrap_err();
    assert!(matches!(err, AppError::Expired));

    // nothing was consumed
    let record = records::get_code(&db.get().unwrap(), "KLEXPIRED").unwrap().unwrap();
    assert_eq!(record.used, 0);
}

#[tokio::test]
async fn test_claim_used_up_code_fails() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "", SlotDuration::Hours(6));
    let mut record = create_test_code(&db, "KLSPENT", "premium", 2);
    record.used = 2;
    records::put_code(&db.get().unwrap(), &record).unwrap();

    let err = engine::claim(&db, "KLSPENT", "user42", now()).await.unwrap_err();
    assert!(matches!(err, AppError::UsedUp));
}

#[tokio::test]
async fn test_claim_with_empty_pool_is_unassigned_success() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "", SlotDuration::Hours(6));
    create_test_code(&db, "KLNOPOOL", "premium", 1);

    let outcome = engine::claim(&db, "KLNOPOOL", "user42", now()).await.unwrap();
    assert_eq!(outcome.assignment, Assignment::Unbound);
    assert!(outcome.lease.credential_id.is_none());
    assert!(outcome.lease.payload.is_empty());

    // the claim stood: the use is consumed and the lease persisted
    let conn = db.get().unwrap();
    assert_eq!(records::get_code(&conn, "KLNOPOOL").unwrap().unwrap().used, 1);
    assert!(records::get_lease(&conn, "KLNOPOOL").unwrap().is_some());
}

#[tokio::test]
async fn test_claim_day_duration_gives_24_hour_lease() {
    let db = memory_pool();
    create_test_slot(&db, "daily", "", SlotDuration::Text("1 day".into()));
    create_test_code(&db, "KLDAILY", "daily", 1);

    let base = now();
    let lease = engine::claim(&db, "KLDAILY", "user42", base).await.unwrap().lease;
    let start = keylease::clock::parse_local(&lease.start_time).unwrap();
    let end = keylease::clock::parse_local(&lease.end_time).unwrap();
    assert_eq!(end - start, 24 * 3600);
}

#[tokio::test]
async fn test_claim_unparseable_duration_falls_back_to_six_hours() {
    let db = memory_pool();
    create_test_slot(&db, "odd", "", SlotDuration::Text("soonish".into()));
    create_test_code(&db, "KLODD22", "odd", 1);

    let lease = engine::claim(&db, "KLODD22", "user42", now()).await.unwrap().lease;
    let start = keylease::clock::parse_local(&lease.start_time).unwrap();
    let end = keylease::clock::parse_local(&lease.end_time).unwrap();
    assert_eq!(end - start, 6 * 3600);
}

#[tokio::test]
async fn test_six_hour_lease_window_wall_clock() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "", SlotDuration::Hours(6));
    create_test_code(&db, "KLCLOCK", "premium", 1);

    // Claim at exactly 10:00:00 local time on a fixed date.
    let base = chrono::Local
        .with_ymd_and_hms(2026, 1, 15, 10, 0, 0)
        .earliest()
        .unwrap()
        .timestamp();
    let lease = engine::claim(&db, "KLCLOCK", "user42", base).await.unwrap().lease;

    assert!(lease.start_time.ends_with("10:00:00"), "{}", lease.start_time);
    assert!(lease.end_time.ends_with("16:00:00"), "{}", lease.end_time);

    // Valid through the last second of the window, expired one past it.
    let conn = db.get().unwrap();
    let end = base + 6 * 3600;
    assert!(engine::view(&conn, "KLCLOCK", end).is_ok());
    let err = engine::view(&conn, "KLCLOCK", end + 1).unwrap_err();
    assert!(matches!(err, AppError::Expired));
}

#[tokio::test]
async fn test_label_mode_from_config_flag() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "acmeflix", SlotDuration::Hours(6));
    create_test_code(&db, "KLLABEL", "premium", 1);
    records::put_config(
        &db.get().unwrap(),
        "approve_flow_label_mode",
        &json!(" Platform "),
    )
    .unwrap();

    let lease = engine::claim(&db, "KLLABEL", "user42", now()).await.unwrap().lease;
    assert_eq!(lease.label_mode, LabelMode::Platform);
    assert_eq!(lease.headline, "acmeflix Account");
}

#[tokio::test]
async fn test_label_mode_from_legacy_boolean() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "acmeflix", SlotDuration::Hours(6));
    create_test_code(&db, "KLLEGACY", "premium", 1);
    records::put_config(&db.get().unwrap(), "use_platform_label", &json!(true)).unwrap();

    let lease = engine::claim(&db, "KLLEGACY", "user42", now()).await.unwrap().lease;
    assert_eq!(lease.label_mode, LabelMode::Platform);
}

#[tokio::test]
async fn test_platform_label_without_platform_uses_slot_name() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "", SlotDuration::Hours(6));
    create_test_code(&db, "KLNOPLAT", "premium", 1);
    records::put_config(&db.get().unwrap(), "use_platform_label", &json!(true)).unwrap();

    let lease = engine::claim(&db, "KLNOPLAT", "user42", now()).await.unwrap().lease;
    assert_eq!(lease.headline, "Premium Account");
}

#[tokio::test]
async fn test_multi_use_code_joins_existing_lease() {
    let db = memory_pool();
    create_test_slot(&db, "premium", "", SlotDuration::Hours(6));
    create_test_credential(&db, "c1", json!(["premium"]), json!([]));
    create_test_code(&db, "KLSHARED", "premium", 2);

    let base = now();
    let first = engine::claim(&db, "KLSHARED", "alice", base).await.unwrap();
    let second = engine::claim(&db, "KLSHARED", "bob", base + 1).await.unwrap();

    // one lease, created by the first claim
    assert_eq!(second.lease.consumer, "alice");
    assert_eq!(second.lease.start_time, first.lease.start_time);
    assert_eq!(second.lease.credential_id, first.lease.credential_id);

    let record = records::get_code(&db.get().unwrap(), "KLSHARED").unwrap().unwrap();
    assert_eq!(record.used, 2);
    let consumers: Vec<&str> = record.uses.iter().map(|u| u.by.as_str()).collect();
    assert_eq!(consumers, vec!["alice", "bob"]);

    // a third claim is refused
    let err = engine::claim(&db, "KLSHARED", "carol", base + 2).await.unwrap_err();
    assert!(matches!(err, AppError::UsedUp));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_single_use_code_has_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_pool(&dir.path().join("race.db"));
    create_test_slot(&db, "premium", "", SlotDuration::Hours(6));
    create_test_credential(&db, "c1", json!(["premium"]), json!([]));
    create_test_code(&db, "KLRACE1", "premium", 1);

    let base = now();
    let mut handles = Vec::new();
    for i in 0..8 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            engine::claim(&db, "KLRACE1", &format!("user{}", i), base).await
        }));
    }

    let mut wins = 0;
    let mut losses = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(e) => {
                assert!(
                    matches!(e, AppError::UsedUp | AppError::RaceFailed),
                    "unexpected claim failure: {:?}",
                    e
                );
                losses += 1;
            }
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(losses, 7);

    let record = records::get_code(&db.get().unwrap(), "KLRACE1").unwrap().unwrap();
    assert_eq!(record.used, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_claims_never_exceed_max_uses() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_pool(&dir.path().join("race3.db"));
    create_test_slot(&db, "premium", "", SlotDuration::Hours(6));
    create_test_code(&db, "KLRACE3", "premium", 3);

    let base = now();
    let mut handles = Vec::new();
    for i in 0..12 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            engine::claim(&db, "KLRACE3", &format!("user{}", i), base).await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            wins += 1;
        }
    }

    let record = records::get_code(&db.get().unwrap(), "KLRACE3").unwrap().unwrap();
    assert!(record.used <= 3, "cap exceeded: {}", record.used);
    assert!(wins >= 1);
    assert!(wins <= 3);
    assert_eq!(record.used, wins);
}
