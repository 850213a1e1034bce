//! # SQLite database methods
//!
//! Low-level SQLite interactions, written as plain functions that accept a `&mut SqliteConnection`. Callers pass a
//! pooled connection for one-off reads, or `&mut *tx` to compose several calls into one atomic unit.
//!
//! SQLite has no row-level locks. Multi-statement units therefore start with a write against the row they are
//! about to read-modify-write (see the `lock_*` functions). That first write takes the database write lock, waiting
//! on the busy timeout if another unit holds it, so the reads that follow cannot be invalidated before commit.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqliteConnection,
    SqlitePool,
};

pub mod carts;
pub mod deliveries;
pub mod deposits;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod permissions;
pub mod products;
pub mod vouchers;
pub mod wallets;

const SQLITE_DB_URL: &str = "sqlite://data/keyshop.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_url() -> String {
    let result = env::var("KSP_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ KSP_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

/// Takes the database write lock for the calling unit without changing any data.
///
/// Use this to open a unit that must read before its first real write.
pub async fn take_write_lock(conn: &mut SqliteConnection) -> Result<(), SqlxError> {
    sqlx::query("UPDATE products SET stock = stock WHERE 0").execute(conn).await?;
    Ok(())
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
