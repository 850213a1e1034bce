//! SQLite backend for the Keyshop engine.
//!
//! [`db`] holds the individual queries. They take a bare connection so that [`SqliteDatabase`] can compose several of
//! them into one transaction.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
