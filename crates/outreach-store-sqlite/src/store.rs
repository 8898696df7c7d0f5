//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use outreach_core::{
  Error as CoreError,
  schema::{IndexSpec, Validator, is_identifier},
  store::{CollectionInfo, Document, DocumentStore},
  validate::{Violation, ViolationKind, Violations, json_type_name},
};

use crate::{
  Error, Result,
  encode::{
    RawCollection, RawDocument, constraint_message, decode_validator,
    encode_dt, encode_uuid, encode_validator, index_ddl,
    index_name_from_message, index_sql_name, sql_param,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An outreach document store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  ///
  /// `busy_timeout` bounds how long a write waits on a lock held by another
  /// connection. Failure to open the file is reported as
  /// [`CoreError::Connection`].
  pub async fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(|e| connection_error(format!("{}: {e}", path.display())))?;
    let store = Self { conn };
    store.init_schema(Some(busy_timeout)).await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(|e| connection_error(e.to_string()))?;
    let store = Self { conn };
    store.init_schema(None).await?;
    Ok(store)
  }

  async fn init_schema(&self, busy_timeout: Option<Duration>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        if let Some(timeout) = busy_timeout {
          conn.busy_timeout(timeout)?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(|e| connection_error(e.to_string()))?;
    Ok(())
  }

  /// Look up a collection's validator.
  ///
  /// Returns `None` if the collection does not exist, `Some(None)` if it is
  /// unstructured.
  async fn collection_validator(&self, name: &str) -> Result<Option<Option<Validator>>> {
    let name = name.to_owned();

    let raw: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT validator_json FROM collections WHERE name = ?1",
              rusqlite::params![name],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|json| decode_validator(json.as_deref()))
      .transpose()
  }

  async fn require_collection(&self, name: &str) -> Result<Option<Validator>> {
    self
      .collection_validator(name)
      .await?
      .ok_or_else(|| CoreError::CollectionNotFound(name.to_owned()).into())
  }
}

fn connection_error(msg: String) -> Error { CoreError::Connection(msg).into() }

fn spec_error(msg: String) -> Error { CoreError::ValidationSpec(msg).into() }

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await
      .map_err(|e| connection_error(e.to_string()))
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
    let raws: Vec<RawCollection> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT name, validator_json, created_at FROM collections ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCollection {
              name:           row.get(0)?,
              validator_json: row.get(1)?,
              created_at:     row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCollection::into_info).collect()
  }

  async fn create_collection(
    &self,
    name: &str,
    validator: Option<&Validator>,
  ) -> Result<()> {
    if !is_identifier(name) {
      return Err(spec_error(format!("invalid collection name {name:?}")));
    }
    if let Some(v) = validator {
      v.check()?;
    }

    let name_owned     = name.to_owned();
    let validator_json = encode_validator(validator)?;
    let at_str         = encode_dt(Utc::now());

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO collections (name, validator_json, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![name_owned, validator_json, at_str],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if constraint_message(&e).is_some() => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      debug!(collection = name, "collection already exists");
      return Err(CoreError::AlreadyExists(name.to_owned()).into());
    }
    Ok(())
  }

  async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()> {
    index.check()?;
    self.require_collection(collection).await?;

    let collection_owned = collection.to_owned();
    let index_name       = index.name.clone();
    let sql_name         = index_sql_name(collection, index);
    let ddl              = index_ddl(collection, index);
    let spec_json        = serde_json::to_string(index)?;

    debug!(collection, index = %index.name, %ddl, "creating index");

    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        conn.execute(
          "INSERT OR IGNORE INTO collection_indexes (collection, name, sql_name, spec_json)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![collection_owned, index_name, sql_name, spec_json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_indexes(&self, collection: &str) -> Result<Vec<String>> {
    self.require_collection(collection).await?;
    let collection = collection.to_owned();

    let names: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT name FROM collection_indexes WHERE collection = ?1 ORDER BY name",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![collection], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(names)
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn insert_document(&self, collection: &str, body: Value) -> Result<Uuid> {
    let validator = self.require_collection(collection).await?;

    if !body.is_object() {
      let violations = Violations(vec![Violation {
        field: "$root".into(),
        kind:  ViolationKind::NotAnObject { found: json_type_name(&body) },
      }]);
      return Err(
        CoreError::Validation { collection: collection.to_owned(), violations }.into(),
      );
    }
    if let Some(v) = &validator {
      v.validate(&body).map_err(|violations| CoreError::Validation {
        collection: collection.to_owned(),
        violations,
      })?;
    }

    let document_id      = Uuid::new_v4();
    let id_str           = encode_uuid(document_id);
    let collection_owned = collection.to_owned();
    let body_str         = body.to_string();
    let at_str           = encode_dt(Utc::now());

    let clash: Option<String> = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO documents (document_id, collection, body_json, inserted_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, collection_owned, body_str, at_str],
        );
        match res {
          Ok(_) => Ok(None),
          Err(e) => match constraint_message(&e) {
            Some(msg) => Ok(Some(msg)),
            None => Err(e.into()),
          },
        }
      })
      .await?;

    if let Some(msg) = clash {
      warn!(collection, %msg, "insert rejected by unique index");
      return Err(
        CoreError::DuplicateKey {
          collection: collection.to_owned(),
          index:      index_name_from_message(collection, &msg),
        }
        .into(),
      );
    }

    Ok(document_id)
  }

  async fn find_one(
    &self,
    collection: &str,
    field: &str,
    value: &Value,
  ) -> Result<Option<Document>> {
    self.require_collection(collection).await?;
    let collection = collection.to_owned();
    let path       = format!("$.{field}");
    let param      = sql_param(value);

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT document_id, collection, body_json, inserted_at
               FROM documents
               WHERE collection = ?1 AND json_extract(body_json, ?2) IS ?3
               ORDER BY rowid
               LIMIT 1",
              rusqlite::params![collection, path, param],
              |row| {
                Ok(RawDocument {
                  document_id: row.get(0)?,
                  collection:  row.get(1)?,
                  body_json:   row.get(2)?,
                  inserted_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn count_documents(&self, collection: &str) -> Result<u64> {
    self.require_collection(collection).await?;
    let collection = collection.to_owned();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM documents WHERE collection = ?1",
          rusqlite::params![collection],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }
}
