//! Schema-as-data descriptors.
//!
//! A [`CollectionSpec`] names a collection and optionally attaches a
//! [`Validator`] and secondary [`IndexSpec`]s. Validators mirror the
//! `$jsonSchema` subset the datastore enforces: a required-field list plus
//! per-property `bsonType`, `enum`, and `minLength` constraints. Descriptors
//! serialize to JSON so a backend can persist them in its catalog.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Field types ─────────────────────────────────────────────────────────────

/// The `bsonType` of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
  String,
  /// An extended-JSON timestamp; see [`crate::date`].
  Date,
  /// An integral number.
  Int,
  /// Any number.
  Double,
  Bool,
  Object,
  Array,
}

impl FieldType {
  pub fn type_name(&self) -> &'static str {
    match self {
      Self::String => "string",
      Self::Date => "date",
      Self::Int => "int",
      Self::Double => "double",
      Self::Bool => "bool",
      Self::Object => "object",
      Self::Array => "array",
    }
  }
}

// ─── Property constraints ────────────────────────────────────────────────────

/// Constraints on a single declared property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
  #[serde(rename = "bsonType")]
  pub bson_type:   FieldType,
  /// Allowed values; only meaningful for `string` properties.
  #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
  pub allowed:     Option<Vec<String>>,
  /// Minimum length in characters; only meaningful for `string` properties.
  #[serde(rename = "minLength", default, skip_serializing_if = "Option::is_none")]
  pub min_length:  Option<usize>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl PropertySchema {
  pub fn new(bson_type: FieldType) -> Self {
    Self { bson_type, allowed: None, min_length: None, description: None }
  }

  pub fn string() -> Self { Self::new(FieldType::String) }

  pub fn date() -> Self { Self::new(FieldType::Date) }

  /// Restrict a string property to the given values.
  pub fn one_of<I, S>(mut self, values: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.allowed = Some(values.into_iter().map(Into::into).collect());
    self
  }

  pub fn min_length(mut self, len: usize) -> Self {
    self.min_length = Some(len);
    self
  }

  pub fn describe(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }
}

// ─── Validator ───────────────────────────────────────────────────────────────

/// A structural constraint attached to a collection and enforced on write.
///
/// Undeclared fields are permitted; only declared properties are type-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
  /// Always `object`; kept so the stored form matches `$jsonSchema`.
  #[serde(rename = "bsonType")]
  pub bson_type:  FieldType,
  pub required:   Vec<String>,
  pub properties: BTreeMap<String, PropertySchema>,
}

impl Validator {
  /// An object validator with no constraints yet.
  pub fn object() -> Self {
    Self {
      bson_type:  FieldType::Object,
      required:   Vec::new(),
      properties: BTreeMap::new(),
    }
  }

  /// Declare a property that must be present.
  pub fn require(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
    let name = name.into();
    self.required.push(name.clone());
    self.properties.insert(name, schema);
    self
  }

  /// Declare a property that is type-checked only when present.
  pub fn optional(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
    self.properties.insert(name.into(), schema);
    self
  }

  /// Reject descriptors that could never be satisfied or enforced.
  pub fn check(&self) -> Result<()> {
    if self.bson_type != FieldType::Object {
      return Err(spec_error(format!(
        "validator root must be an object, got {}",
        self.bson_type.type_name()
      )));
    }

    let mut seen = HashSet::new();
    for field in &self.required {
      if !seen.insert(field.as_str()) {
        return Err(spec_error(format!("field {field:?} is required twice")));
      }
      if !self.properties.contains_key(field) {
        return Err(spec_error(format!(
          "required field {field:?} has no property declaration"
        )));
      }
    }

    for (name, prop) in &self.properties {
      if !is_identifier(name) {
        return Err(spec_error(format!("invalid property name {name:?}")));
      }
      let is_string = prop.bson_type == FieldType::String;
      match &prop.allowed {
        Some(_) if !is_string => {
          return Err(spec_error(format!(
            "enum on non-string property {name:?}"
          )));
        }
        Some(values) if values.is_empty() => {
          return Err(spec_error(format!("empty enum on property {name:?}")));
        }
        _ => {}
      }
      if prop.min_length.is_some() && !is_string {
        return Err(spec_error(format!(
          "minLength on non-string property {name:?}"
        )));
      }
    }

    Ok(())
  }
}

// ─── Indexes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
  pub field: String,
  pub order: SortOrder,
}

/// A secondary index over one or more top-level document fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
  pub name:   String,
  pub keys:   Vec<IndexKey>,
  pub unique: bool,
}

impl IndexSpec {
  /// Build a non-unique index. The name follows the `field_1_other_-1`
  /// convention so it is stable across runs.
  pub fn on<'a>(keys: impl IntoIterator<Item = (&'a str, SortOrder)>) -> Self {
    let keys: Vec<IndexKey> = keys
      .into_iter()
      .map(|(field, order)| IndexKey { field: field.to_owned(), order })
      .collect();
    let name = keys
      .iter()
      .map(|k| {
        let dir = match k.order {
          SortOrder::Asc => "1",
          SortOrder::Desc => "-1",
        };
        format!("{}_{dir}", k.field)
      })
      .collect::<Vec<_>>()
      .join("_");
    Self { name, keys, unique: false }
  }

  /// Shorthand for a single ascending field.
  pub fn field(field: &str) -> Self { Self::on([(field, SortOrder::Asc)]) }

  pub fn unique(mut self) -> Self {
    self.unique = true;
    self
  }

  pub fn check(&self) -> Result<()> {
    if self.keys.is_empty() {
      return Err(spec_error(format!("index {:?} has no keys", self.name)));
    }
    for key in &self.keys {
      if !is_identifier(&key.field) {
        return Err(spec_error(format!(
          "index {:?} has invalid field {:?}",
          self.name, key.field
        )));
      }
    }
    Ok(())
  }
}

// ─── Collections ─────────────────────────────────────────────────────────────

/// Everything the registrar needs to provision one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
  pub name:      String,
  pub validator: Option<Validator>,
  #[serde(default)]
  pub indexes:   Vec<IndexSpec>,
}

impl CollectionSpec {
  /// A collection with no enforced schema.
  pub fn unstructured(name: impl Into<String>) -> Self {
    Self { name: name.into(), validator: None, indexes: Vec::new() }
  }

  pub fn validated(name: impl Into<String>, validator: Validator) -> Self {
    Self { name: name.into(), validator: Some(validator), indexes: Vec::new() }
  }

  pub fn with_index(mut self, index: IndexSpec) -> Self {
    self.indexes.push(index);
    self
  }

  pub fn check(&self) -> Result<()> {
    if !is_identifier(&self.name) {
      return Err(spec_error(format!("invalid collection name {:?}", self.name)));
    }
    if let Some(validator) = &self.validator {
      validator.check().map_err(|e| match e {
        Error::ValidationSpec(msg) => {
          spec_error(format!("collection {:?}: {msg}", self.name))
        }
        other => other,
      })?;
    }
    let mut names = HashSet::new();
    for index in &self.indexes {
      index.check()?;
      if !names.insert(index.name.as_str()) {
        return Err(spec_error(format!(
          "collection {:?} declares index {:?} twice",
          self.name, index.name
        )));
      }
    }
    Ok(())
  }
}

/// Check every descriptor in `catalog`, plus name uniqueness across it.
pub fn check_catalog(catalog: &[CollectionSpec]) -> Result<()> {
  let mut names = HashSet::new();
  for spec in catalog {
    spec.check()?;
    if !names.insert(spec.name.as_str()) {
      return Err(spec_error(format!("collection {:?} declared twice", spec.name)));
    }
  }
  Ok(())
}

/// ASCII letters, digits and `_`, not starting with a digit.
///
/// Collection and index field names end up inside SQL text in the SQLite
/// backend, so anything else is refused up front.
pub fn is_identifier(s: &str) -> bool {
  let mut chars = s.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn spec_error(msg: String) -> Error { Error::ValidationSpec(msg) }
