//! Core types and trait definitions for the outreach datastore.
//!
//! This crate holds the data-model contract (record shapes, collection
//! validators, index descriptors), the [`store::DocumentStore`] abstraction
//! that backends implement, and the [`registrar`] that provisions a fresh
//! database. It is deliberately free of database dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod date;
pub mod error;
pub mod model;
pub mod registrar;
pub mod schema;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
