//! Write-time document validation against a [`Validator`].
//!
//! Semantics:
//! - the document must be a JSON object;
//! - every required field must be present;
//! - every present declared property must match its `bsonType` (`null` never
//!   matches);
//! - `enum` and `minLength` apply to string properties;
//! - undeclared fields are allowed.
//!
//! All violations are collected rather than stopping at the first one, in
//! required-list order followed by property-name order.

use std::fmt;

use serde_json::Value;

use crate::{
  date,
  schema::{FieldType, PropertySchema, Validator},
};

// ─── Violations ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
  NotAnObject { found: &'static str },
  Missing,
  TypeMismatch { expected: FieldType, found: &'static str },
  NotInEnum { value: String },
  TooShort { min: usize, len: usize },
}

/// One reason a document was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
  /// Field name, or `$root` for whole-document problems.
  pub field: String,
  pub kind:  ViolationKind,
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let field = &self.field;
    match &self.kind {
      ViolationKind::NotAnObject { found } => {
        write!(f, "{field}: expected object, found {found}")
      }
      ViolationKind::Missing => write!(f, "{field}: required field is missing"),
      ViolationKind::TypeMismatch { expected, found } => {
        write!(f, "{field}: expected {}, found {found}", expected.type_name())
      }
      ViolationKind::NotInEnum { value } => {
        write!(f, "{field}: {value:?} is not an allowed value")
      }
      ViolationKind::TooShort { min, len } => {
        write!(f, "{field}: length {len} is below the minimum of {min}")
      }
    }
  }
}

/// The full set of violations for one rejected document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
  pub fn iter(&self) -> std::slice::Iter<'_, Violation> { self.0.iter() }

  /// Whether any violation concerns `field`.
  pub fn touches(&self, field: &str) -> bool {
    self.0.iter().any(|v| v.field == field)
  }
}

impl fmt::Display for Violations {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, v) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("; ")?;
      }
      write!(f, "{v}")?;
    }
    Ok(())
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

impl Validator {
  /// Validate `document`. Does not mutate it.
  pub fn validate(&self, document: &Value) -> Result<(), Violations> {
    let Some(obj) = document.as_object() else {
      return Err(Violations(vec![Violation {
        field: "$root".into(),
        kind:  ViolationKind::NotAnObject { found: json_type_name(document) },
      }]));
    };

    let mut out = Vec::new();

    for field in &self.required {
      if !obj.contains_key(field) {
        out.push(Violation { field: field.clone(), kind: ViolationKind::Missing });
      }
    }

    for (name, prop) in &self.properties {
      if let Some(value) = obj.get(name) {
        check_property(name, prop, value, &mut out);
      }
    }

    if out.is_empty() { Ok(()) } else { Err(Violations(out)) }
  }
}

fn check_property(
  name: &str,
  prop: &PropertySchema,
  value: &Value,
  out: &mut Vec<Violation>,
) {
  if !matches_type(prop.bson_type, value) {
    out.push(Violation {
      field: name.to_owned(),
      kind:  ViolationKind::TypeMismatch {
        expected: prop.bson_type,
        found:    json_type_name(value),
      },
    });
    return;
  }

  let Some(s) = value.as_str() else { return };

  if let Some(allowed) = &prop.allowed
    && !allowed.iter().any(|a| a == s)
  {
    out.push(Violation {
      field: name.to_owned(),
      kind:  ViolationKind::NotInEnum { value: s.to_owned() },
    });
  }

  if let Some(min) = prop.min_length {
    let len = s.chars().count();
    if len < min {
      out.push(Violation {
        field: name.to_owned(),
        kind:  ViolationKind::TooShort { min, len },
      });
    }
  }
}

fn matches_type(expected: FieldType, value: &Value) -> bool {
  match expected {
    FieldType::String => value.is_string(),
    FieldType::Date => date::is_date(value),
    FieldType::Int => value.is_i64() || value.is_u64(),
    FieldType::Double => value.is_number(),
    FieldType::Bool => value.is_boolean(),
    FieldType::Object => value.is_object() && !date::is_date(value),
    FieldType::Array => value.is_array(),
  }
}

/// The type name used in violation messages. Encoded timestamps report as
/// `date`.
pub fn json_type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(n) if n.is_f64() => "double",
    Value::Number(_) => "int",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) if date::is_date(value) => "date",
    Value::Object(_) => "object",
  }
}
