//! Compare-and-retry primitive for counters the store cannot increment
//! atomically.
//!
//! The backing store offers point reads and writes but no transactions, so
//! an increment is read → write → re-read. A step reports whether its write
//! survived; losing writes back off and rerun from a fresh read, up to a
//! bounded attempt count. Write failures and lost races are both transient
//! here — exhaustion surfaces as `RaceFailed`, which callers may retry.

use std::time::Duration;

use rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::store::DbPool;

/// Outcome of one optimistic attempt.
pub enum Attempt<T> {
    /// Write confirmed by the post-write read.
    Won(T),
    /// The store rejected the write.
    WriteFailed,
    /// The post-write read showed another writer got there first.
    RaceLost,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub write_backoff: Duration,
    pub race_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            write_backoff: Duration::from_millis(100),
            race_backoff: Duration::from_millis(80),
        }
    }
}

/// Run `step` until it wins or the policy's attempts are exhausted.
///
/// Each attempt gets a fresh connection and must do its own read, precondition
/// check, write and verify. Terminal business failures (`Err`) propagate
/// immediately and are never retried. The connection is released before any
/// backoff sleep.
pub async fn run<T, F>(db: &DbPool, policy: &RetryPolicy, mut step: F) -> Result<T>
where
    F: FnMut(&Connection) -> Result<Attempt<T>>,
{
    for attempt in 0..policy.attempts {
        let backoff = {
            let conn = db.get()?;
            match step(&conn)? {
                Attempt::Won(value) => return Ok(value),
                Attempt::WriteFailed => policy.write_backoff,
                Attempt::RaceLost => policy.race_backoff,
            }
        };
        if attempt + 1 < policy.attempts {
            tokio::time::sleep(backoff).await;
        }
    }
    Err(AppError::RaceFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::init_db;
    use r2d2_sqlite::SqliteConnectionManager;

    fn test_pool() -> DbPool {
        let pool = r2d2::Pool::builder()
            .max_size(2)
            .build(SqliteConnectionManager::memory())
            .unwrap();
        init_db(&pool.get().unwrap()).unwrap();
        pool
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 4,
            write_backoff: Duration::from_millis(1),
            race_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_first_attempt_win() {
        let db = test_pool();
        let result = run(&db, &fast_policy(), |_conn| Ok(Attempt::Won(42))).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retries_then_wins() {
        let db = test_pool();
        let mut calls = 0;
        let result = run(&db, &fast_policy(), |_conn| {
            calls += 1;
            if calls < 3 {
                Ok(Attempt::RaceLost)
            } else {
                Ok(Attempt::Won("ok"))
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_race_failed() {
        let db = test_pool();
        let mut calls = 0;
        let result: Result<()> = run(&db, &fast_policy(), |_conn| {
            calls += 1;
            Ok(Attempt::WriteFailed)
        })
        .await;
        assert!(matches!(result, Err(AppError::RaceFailed)));
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn test_terminal_error_not_retried() {
        let db = test_pool();
        let mut calls = 0;
        let result: Result<()> = run(&db, &fast_policy(), |_conn| {
            calls += 1;
            Err(AppError::Revoked)
        })
        .await;
        assert!(matches!(result, Err(AppError::Revoked)));
        assert_eq!(calls, 1);
    }
}
