use rusqlite::Connection;

/// Initialize the store schema.
///
/// Everything lives in a single key-value table of JSON documents. The
/// engine only ever touches it through point reads, point writes and prefix
/// scans — mirroring the contract of a store with no multi-key atomicity.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
}
