//! Error types for `outreach-core`.

use thiserror::Error;

use crate::validate::Violations;

#[derive(Debug, Error)]
pub enum Error {
  /// The datastore could not be opened or reached.
  #[error("cannot reach datastore: {0}")]
  Connection(String),

  #[error("collection already exists: {0}")]
  AlreadyExists(String),

  /// A collection descriptor is malformed. This is a programming error in the
  /// catalog, never a runtime condition.
  #[error("malformed schema definition: {0}")]
  ValidationSpec(String),

  /// A write was rejected by the collection's validator.
  #[error("document rejected by {collection} validator: {violations}")]
  Validation {
    collection: String,
    violations: Violations,
  },

  #[error("collection not found: {0}")]
  CollectionNotFound(String),

  #[error("duplicate key in {collection} for unique index {index}")]
  DuplicateKey { collection: String, index: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
