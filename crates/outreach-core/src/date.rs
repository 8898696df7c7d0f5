//! Timestamp encoding for documents.
//!
//! Documents are plain JSON, so a timestamp needs a shape that cannot be
//! confused with an ordinary string. We use the extended-JSON form
//! `{"$date": "<RFC 3339>"}`; the validator's `date` type accepts only that
//! shape.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

/// The single key of an encoded timestamp object.
pub const DATE_KEY: &str = "$date";

#[derive(Serialize, Deserialize)]
struct ExtDate {
  #[serde(rename = "$date", serialize_with = "serialize_millis")]
  date: DateTime<Utc>,
}

/// Encoded timestamps are compared and indexed as text, so every writer must
/// use this one format.
fn format_millis(dt: &DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_millis<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_str(&format_millis(dt))
}

/// The current time at the precision timestamps are stored with, so a record
/// built from it survives a write and read unchanged.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(3) }

/// Encode `dt` as an extended-JSON date value.
pub fn to_value(dt: DateTime<Utc>) -> Value {
  json!({ DATE_KEY: format_millis(&dt) })
}

/// Decode an extended-JSON date value. Returns `None` for anything else,
/// including a `$date` object whose payload is not RFC 3339.
pub fn from_value(value: &Value) -> Option<DateTime<Utc>> {
  let obj = value.as_object().filter(|o| o.len() == 1)?;
  let raw = obj.get(DATE_KEY)?.as_str()?;
  DateTime::parse_from_rfc3339(raw)
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

pub fn is_date(value: &Value) -> bool { from_value(value).is_some() }

/// `#[serde(with = "date::required")]` for `DateTime<Utc>` fields.
pub mod required {
  use super::*;

  pub fn serialize<S: Serializer>(
    dt: &DateTime<Utc>,
    s: S,
  ) -> Result<S::Ok, S::Error> {
    ExtDate { date: *dt }.serialize(s)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    d: D,
  ) -> Result<DateTime<Utc>, D::Error> {
    ExtDate::deserialize(d).map(|e| e.date)
  }
}

/// `#[serde(with = "date::optional")]` for `Option<DateTime<Utc>>` fields.
/// Pair with `default` and `skip_serializing_if = "Option::is_none"`.
pub mod optional {
  use super::*;

  pub fn serialize<S: Serializer>(
    dt: &Option<DateTime<Utc>>,
    s: S,
  ) -> Result<S::Ok, S::Error> {
    dt.map(|date| ExtDate { date }).serialize(s)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    d: D,
  ) -> Result<Option<DateTime<Utc>>, D::Error> {
    Option::<ExtDate>::deserialize(d).map(|e| e.map(|e| e.date))
  }
}
