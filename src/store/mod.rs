mod schema;
pub mod kv;
pub mod records;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::mail::MailClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the store pool and shared collaborators.
#[derive(Clone)]
pub struct AppState {
    /// Backing key-value store (codes, slots, credentials, leases, config).
    pub db: DbPool,
    /// Shared secret for the administrative surface.
    pub admin_key: String,
    /// Delivery-status collaborator for externally-delivered codes.
    pub mail: Arc<MailClient>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        // Concurrent claimants hammer the same rows; wait for the writer
        // instead of surfacing SQLITE_BUSY as a failed store write.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.pragma_update(None, "journal_mode", "WAL")
    });
    Pool::builder().max_size(10).build(manager)
}
