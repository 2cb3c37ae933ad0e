mod from_row;
mod schema;
pub mod queries;

pub use from_row::{FromRow, query_all, query_one};
pub use schema::init_db;

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every handler. All durable state lives in the
/// database; nothing request-spanning is kept in memory.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
}

/// Per-connection settings: enforce foreign keys and wait on locks instead of
/// failing immediately.
fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", true)
}

pub fn create_pool(
    database_path: &str,
    max_size: u32,
    busy_timeout_ms: u64,
) -> Result<DbPool, r2d2::Error> {
    let busy_timeout = Duration::from_millis(busy_timeout_ms);
    let manager = SqliteConnectionManager::file(database_path).with_init(move |conn| {
        configure_connection(conn, busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Ok(())
    });
    Pool::builder().max_size(max_size).build(manager)
}

/// Single-connection in-memory pool. Every in-memory connection is its own
/// database, so the pool must never hand out a second one.
pub fn create_memory_pool() -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| configure_connection(conn, Duration::from_secs(5)));
    Pool::builder().max_size(1).build(manager)
}
