//! Encoding and decoding helpers between core types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Validators, index specs and
//! document bodies are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use outreach_core::{
  schema::{IndexSpec, SortOrder, Validator},
  store::{CollectionInfo, Document},
};
use uuid::Uuid;

use crate::{Error, Result, schema::INDEX_PREFIX};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Validator ───────────────────────────────────────────────────────────────

pub fn encode_validator(v: Option<&Validator>) -> Result<Option<String>> {
  Ok(v.map(serde_json::to_string).transpose()?)
}

pub fn decode_validator(s: Option<&str>) -> Result<Option<Validator>> {
  Ok(s.map(serde_json::from_str).transpose()?)
}

// ─── Indexes ─────────────────────────────────────────────────────────────────

/// Name of the SQLite index backing `index` on `collection`.
pub fn index_sql_name(collection: &str, index: &IndexSpec) -> String {
  format!("{INDEX_PREFIX}{collection}__{}", index.name)
}

/// Recover the collection-level index name from a SQLite constraint message
/// such as `UNIQUE constraint failed: index 'ix_profiles__url_1'`.
pub fn index_name_from_message(collection: &str, message: &str) -> String {
  let prefix = format!("{INDEX_PREFIX}{collection}__");
  message
    .split('\'')
    .nth(1)
    .and_then(|sql_name| sql_name.strip_prefix(&prefix))
    .map_or_else(|| message.to_owned(), str::to_owned)
}

/// `CREATE INDEX` DDL for `index`, as a partial expression index over the
/// collection's rows.
///
/// Unique keys are wrapped in `json_quote` so a missing field and an explicit
/// `null` both index as the text `null` and collide, instead of counting as
/// distinct SQL NULLs.
///
/// Callers must have checked that `collection` and every key field are
/// identifiers; they are spliced into the statement text.
pub fn index_ddl(collection: &str, index: &IndexSpec) -> String {
  let columns = index
    .keys
    .iter()
    .map(|k| {
      let dir = match k.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
      };
      let extract = format!("json_extract(body_json, '$.{}')", k.field);
      if index.unique {
        format!("json_quote({extract}) {dir}")
      } else {
        format!("{extract} {dir}")
      }
    })
    .collect::<Vec<_>>()
    .join(", ");
  let unique = if index.unique { "UNIQUE " } else { "" };
  format!(
    "CREATE {unique}INDEX IF NOT EXISTS \"{}\" ON documents ({columns}) \
     WHERE collection = '{collection}'",
    index_sql_name(collection, index)
  )
}

// ─── Query parameters ────────────────────────────────────────────────────────

/// Map a JSON value onto what `json_extract` yields for it, so the two
/// compare equal in SQL.
pub fn sql_param(value: &serde_json::Value) -> rusqlite::types::Value {
  use rusqlite::types::Value as Sql;
  use serde_json::Value as Json;

  match value {
    Json::Null => Sql::Null,
    Json::Bool(b) => Sql::Integer(i64::from(*b)),
    Json::Number(n) => match n.as_i64() {
      Some(i) => Sql::Integer(i),
      None => Sql::Real(n.as_f64().unwrap_or(f64::NAN)),
    },
    Json::String(s) => Sql::Text(s.clone()),
    Json::Array(_) | Json::Object(_) => Sql::Text(value.to_string()),
  }
}

// ─── SQLite errors ───────────────────────────────────────────────────────────

/// The message of a constraint violation, or `None` for any other error.
pub fn constraint_message(e: &rusqlite::Error) -> Option<String> {
  match e {
    rusqlite::Error::SqliteFailure(f, msg)
      if f.code == rusqlite::ErrorCode::ConstraintViolation =>
    {
      Some(msg.clone().unwrap_or_default())
    }
    _ => None,
  }
}

// ─── Raw row types ───────────────────────────────────────────────────────────

pub struct RawCollection {
  pub name:           String,
  pub validator_json: Option<String>,
  pub created_at:     String,
}

impl RawCollection {
  pub fn into_info(self) -> Result<CollectionInfo> {
    Ok(CollectionInfo {
      name:       self.name,
      validator:  decode_validator(self.validator_json.as_deref())?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawDocument {
  pub document_id: String,
  pub collection:  String,
  pub body_json:   String,
  pub inserted_at: String,
}

impl RawDocument {
  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      document_id: decode_uuid(&self.document_id)?,
      collection:  self.collection,
      body:        serde_json::from_str(&self.body_json)?,
      inserted_at: decode_dt(&self.inserted_at)?,
    })
  }
}
