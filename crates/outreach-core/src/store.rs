//! The `DocumentStore` trait and supporting types.
//!
//! The trait is the database handle the registrar and the writing
//! application are given. It is implemented by storage backends (e.g.
//! `outreach-store-sqlite`); nothing above this layer depends on a concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{IndexSpec, Validator};

/// A collection as recorded in the store's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
  pub name:       String,
  pub validator:  Option<Validator>,
  pub created_at: DateTime<Utc>,
}

/// A stored document together with its store-assigned metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub document_id: Uuid,
  pub collection:  String,
  pub body:        Value,
  pub inserted_at: DateTime<Utc>,
}

/// Abstraction over a document datastore.
///
/// Writes to a collection with a validator are checked before they are
/// persisted; a rejected write leaves the store unchanged.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait DocumentStore: Send + Sync {
  /// Backend error. Must be able to carry the core taxonomy so generic code
  /// (the registrar) can raise `ValidationSpec` through it.
  type Error: std::error::Error + From<crate::Error> + Send + Sync + 'static;

  /// Round-trip to the datastore. Fails with `Connection` if unreachable.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// All collections, ordered by name.
  fn list_collections(
    &self,
  ) -> impl Future<Output = Result<Vec<CollectionInfo>, Self::Error>> + Send + '_;

  /// Create a collection, optionally attaching a validator.
  ///
  /// Fails with `AlreadyExists` if a collection of that name is present;
  /// the existing collection is left untouched.
  fn create_collection<'a>(
    &'a self,
    name: &'a str,
    validator: Option<&'a Validator>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Create a secondary index. Idempotent: an index of the same name on the
  /// same collection is left as is.
  ///
  /// Fails with `CollectionNotFound` if the collection is missing.
  fn create_index<'a>(
    &'a self,
    collection: &'a str,
    index: &'a IndexSpec,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Names of the secondary indexes on `collection`, ordered by name.
  fn list_indexes<'a>(
    &'a self,
    collection: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Validate and persist `body`, returning the assigned document id.
  ///
  /// Fails with `Validation` if the collection's validator rejects the
  /// document, `DuplicateKey` if a unique index would be violated, and
  /// `CollectionNotFound` if the collection does not exist. Collections are
  /// never created implicitly.
  fn insert_document<'a>(
    &'a self,
    collection: &'a str,
    body: Value,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + 'a;

  /// The earliest-inserted document whose top-level `field` equals `value`.
  ///
  /// Fails with `CollectionNotFound` if the collection does not exist.
  fn find_one<'a>(
    &'a self,
    collection: &'a str,
    field: &'a str,
    value: &'a Value,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  /// Fails with `CollectionNotFound` if the collection does not exist.
  fn count_documents<'a>(
    &'a self,
    collection: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}
