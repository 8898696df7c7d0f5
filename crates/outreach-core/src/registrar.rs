//! The schema registrar: provisions collections, validators and indexes on a
//! caller-supplied [`DocumentStore`].
//!
//! Provisioning is sequential and not transactional. If a step fails, the
//! remaining steps are not attempted and nothing already created is rolled
//! back.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
  catalog::default_catalog,
  schema::{CollectionSpec, check_catalog},
  store::DocumentStore,
};

/// What to do when a catalog collection is already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExisting {
  /// Leave the existing collection untouched and carry on.
  #[default]
  Skip,
  /// Issue the creation request anyway and let the store's `AlreadyExists`
  /// error abort the run.
  Strict,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
  pub created: Vec<String>,
  pub skipped: Vec<String>,
  /// Ensured indexes as `collection.index`.
  pub indexes: Vec<String>,
}

/// Ensure every collection in `catalog` exists on `store`, then ensure their
/// indexes.
///
/// The catalog is checked before anything is written, so a malformed
/// descriptor fails with `ValidationSpec` and leaves the store unchanged.
pub async fn ensure_schema<S: DocumentStore>(
  store: &S,
  catalog: &[CollectionSpec],
  policy: OnExisting,
) -> Result<SchemaReport, S::Error> {
  check_catalog(catalog)?;

  let existing: HashMap<String, _> = match policy {
    OnExisting::Skip => store
      .list_collections()
      .await?
      .into_iter()
      .map(|c| (c.name, c.validator))
      .collect(),
    OnExisting::Strict => HashMap::new(),
  };

  let mut report = SchemaReport::default();

  for spec in catalog {
    if let Some(current) = existing.get(&spec.name) {
      if current.as_ref() != spec.validator.as_ref() {
        warn!(
          collection = %spec.name,
          "existing collection has a different validator; leaving it unchanged"
        );
      }
      info!(collection = %spec.name, "collection already exists, skipping");
      report.skipped.push(spec.name.clone());
      continue;
    }

    store
      .create_collection(&spec.name, spec.validator.as_ref())
      .await?;
    info!(
      collection = %spec.name,
      validated = spec.validator.is_some(),
      "created collection"
    );
    report.created.push(spec.name.clone());
  }

  for spec in catalog {
    for index in &spec.indexes {
      store.create_index(&spec.name, index).await?;
      debug!(
        collection = %spec.name,
        index = %index.name,
        unique = index.unique,
        "ensured index"
      );
      report.indexes.push(format!("{}.{}", spec.name, index.name));
    }
  }

  Ok(report)
}

/// [`ensure_schema`] with the built-in six-collection catalog.
pub async fn ensure_default_schema<S: DocumentStore>(
  store: &S,
  policy: OnExisting,
) -> Result<SchemaReport, S::Error> {
  ensure_schema(store, &default_catalog(), policy).await
}
