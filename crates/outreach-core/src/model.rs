//! Record shapes written by the outreach application.
//!
//! Only [`Profile`] and [`ConnectionRequest`] are enforced by the store (see
//! [`crate::catalog`]); the remaining shapes are conventions the writer keeps
//! on its own. All of them serialize to documents with timestamps in the
//! extended-JSON form from [`crate::date`].

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Result, date};

/// Conversion between a typed record and its stored document form.
pub trait Record: Serialize + DeserializeOwned {
  /// The collection the record lives in.
  const COLLECTION: &'static str;

  fn to_document(&self) -> Result<Value> { Ok(serde_json::to_value(self)?) }

  fn from_document(document: Value) -> Result<Self> {
    Ok(serde_json::from_value(document)?)
  }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// A discovered professional-network profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  /// Stable external identifier.
  pub linkedin_id:   String,
  pub name:          String,
  /// Canonical profile address.
  pub url:           String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:         Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub photo_url:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub headline:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub about:         Option<String>,
  #[serde(with = "date::required")]
  pub discovered_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none", with = "date::optional")]
  pub updated_at:    Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags:          Vec<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub metadata:      BTreeMap<String, Value>,
}

impl Profile {
  /// A profile discovered now, with every optional field unset.
  pub fn new(
    linkedin_id: impl Into<String>,
    name: impl Into<String>,
    url: impl Into<String>,
  ) -> Self {
    Self {
      linkedin_id:   linkedin_id.into(),
      name:          name.into(),
      url:           url.into(),
      title:         None,
      company:       None,
      location:      None,
      photo_url:     None,
      headline:      None,
      about:         None,
      discovered_at: date::now(),
      updated_at:    None,
      tags:          Vec::new(),
      metadata:      BTreeMap::new(),
    }
  }
}

impl Record for Profile {
  const COLLECTION: &'static str = crate::catalog::PROFILES;
}

// ─── ConnectionRequest ───────────────────────────────────────────────────────

/// Lifecycle of an outreach request.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
  Sent,
  Accepted,
  Rejected,
  Withdrawn,
  Pending,
  Failed,
}

impl RequestStatus {
  /// `accepted`, `rejected`, `withdrawn` and `failed` are end states;
  /// `sent` and `pending` still await an outcome.
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Self::Sent | Self::Pending)
  }
}

/// An outreach action targeting a [`Profile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
  /// The target profile's `linkedin_id`. Lookup only; not enforced.
  pub profile_id:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub profile_name:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note:          Option<String>,
  pub status:        RequestStatus,
  #[serde(with = "date::required")]
  pub sent_at:       DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none", with = "date::optional")]
  pub updated_at:    Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none", with = "date::optional")]
  pub accepted_at:   Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
  #[serde(default)]
  pub retry_count:   u32,
}

impl ConnectionRequest {
  /// A request sent now.
  pub fn sent(profile_id: impl Into<String>) -> Self {
    Self {
      profile_id:    profile_id.into(),
      profile_name:  None,
      note:          None,
      status:        RequestStatus::Sent,
      sent_at:       date::now(),
      updated_at:    None,
      accepted_at:   None,
      error_message: None,
      retry_count:   0,
    }
  }
}

impl Record for ConnectionRequest {
  const COLLECTION: &'static str = crate::catalog::CONNECTION_REQUESTS;
}

// ─── Unvalidated collections ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageStatus {
  Sent,
  Failed,
  Delivered,
  Read,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub profile_id:        String,
  pub profile_name:      String,
  pub content:           String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub template_name:     Option<String>,
  #[serde(with = "date::required")]
  pub sent_at:           DateTime<Utc>,
  pub status:            MessageStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_message:     Option<String>,
  pub response_received: bool,
}

impl Record for Message {
  const COLLECTION: &'static str = crate::catalog::MESSAGES;
}

/// One automation step, e.g. `search`, `connect`, `message`, `login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
  pub action:      String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub profile_id:  Option<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub details:     BTreeMap<String, Value>,
  pub success:     bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
  #[serde(with = "date::required")]
  pub created_at:  DateTime<Utc>,
}

impl Record for ActivityLogEntry {
  const COLLECTION: &'static str = crate::catalog::ACTIVITY_LOG;
}

/// A keyed blob of session data (`cookies`, `last_login`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
  pub key:        String,
  pub value:      Value,
  #[serde(with = "date::required")]
  pub updated_at: DateTime<Utc>,
}

impl Record for SessionState {
  const COLLECTION: &'static str = crate::catalog::SESSION_STATE;
}

/// A per-action counter bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRecord {
  /// `connect`, `message`, `search`, ...
  pub action_type:  String,
  /// `YYYY-MM-DD`.
  pub date:         String,
  /// 0-23.
  pub hour:         u32,
  /// ISO week, `YYYY-Www`.
  pub week:         String,
  pub count:        u32,
  #[serde(with = "date::required")]
  pub last_updated: DateTime<Utc>,
}

impl RateLimitRecord {
  /// An empty bucket for `action_type` keyed on the day, hour and ISO week
  /// containing `at`.
  pub fn bucket(action_type: impl Into<String>, at: DateTime<Utc>) -> Self {
    let iso = at.iso_week();
    Self {
      action_type:  action_type.into(),
      date:         at.format("%Y-%m-%d").to_string(),
      hour:         at.hour(),
      week:         format!("{}-W{:02}", iso.year(), iso.week()),
      count:        0,
      last_updated: at,
    }
  }
}

impl Record for RateLimitRecord {
  const COLLECTION: &'static str = crate::catalog::RATE_LIMITS;
}
