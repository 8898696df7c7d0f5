//! SQLite backend for the outreach document store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Collections, their validators and
//! their indexes live in catalog tables; documents are JSON bodies in a single
//! table, indexed per collection with partial expression indexes.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
