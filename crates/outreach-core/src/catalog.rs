//! The built-in collection catalog for the outreach datastore.
//!
//! | Collection            | Validated | Required fields                           |
//! |-----------------------|-----------|-------------------------------------------|
//! | `profiles`            | yes       | linkedin_id, name, url, discovered_at     |
//! | `connection_requests` | yes       | profile_id, status (enum of 6), sent_at   |
//! | `messages`            | no        |                                           |
//! | `activity_log`        | no        |                                           |
//! | `session_state`       | no        |                                           |
//! | `rate_limits`         | no        |                                           |

use strum::IntoEnumIterator as _;

use crate::{
  model::RequestStatus,
  schema::{CollectionSpec, IndexSpec, PropertySchema, SortOrder, Validator},
};

pub const PROFILES: &str = "profiles";
pub const CONNECTION_REQUESTS: &str = "connection_requests";
pub const MESSAGES: &str = "messages";
pub const ACTIVITY_LOG: &str = "activity_log";
pub const SESSION_STATE: &str = "session_state";
pub const RATE_LIMITS: &str = "rate_limits";

/// Every collection name, in provisioning order.
pub const COLLECTION_NAMES: [&str; 6] = [
  PROFILES,
  CONNECTION_REQUESTS,
  MESSAGES,
  ACTIVITY_LOG,
  SESSION_STATE,
  RATE_LIMITS,
];

pub fn profiles_validator() -> Validator {
  Validator::object()
    .require(
      "linkedin_id",
      PropertySchema::string().min_length(1).describe("LinkedIn profile ID - required"),
    )
    .require(
      "name",
      PropertySchema::string().min_length(1).describe("Profile name - required"),
    )
    .require(
      "url",
      PropertySchema::string().min_length(1).describe("LinkedIn profile URL - required"),
    )
    .optional("title", PropertySchema::string().describe("Job title"))
    .optional("company", PropertySchema::string().describe("Company name"))
    .require(
      "discovered_at",
      PropertySchema::date().describe("Discovery timestamp - required"),
    )
    .optional("updated_at", PropertySchema::date().describe("Last update timestamp"))
}

pub fn connection_requests_validator() -> Validator {
  Validator::object()
    .require(
      "profile_id",
      PropertySchema::string().describe("Reference to profile - required"),
    )
    .require(
      "status",
      PropertySchema::string()
        .one_of(RequestStatus::iter().map(|s| s.as_ref().to_owned()))
        .describe("Request status - required"),
    )
    .require("sent_at", PropertySchema::date().describe("Send timestamp - required"))
}

/// The six collections, their validators and their secondary indexes.
pub fn default_catalog() -> Vec<CollectionSpec> {
  use SortOrder::Desc;

  vec![
    CollectionSpec::validated(PROFILES, profiles_validator())
      .with_index(IndexSpec::field("linkedin_id").unique())
      .with_index(IndexSpec::field("url").unique())
      .with_index(IndexSpec::on([("discovered_at", Desc)]))
      .with_index(IndexSpec::field("tags")),
    CollectionSpec::validated(CONNECTION_REQUESTS, connection_requests_validator())
      .with_index(IndexSpec::field("profile_id").unique())
      .with_index(IndexSpec::field("status"))
      .with_index(IndexSpec::on([("sent_at", Desc)]))
      .with_index(IndexSpec::on([("status", SortOrder::Asc), ("sent_at", Desc)])),
    CollectionSpec::unstructured(MESSAGES)
      .with_index(IndexSpec::field("profile_id"))
      .with_index(IndexSpec::on([("sent_at", Desc)]))
      .with_index(IndexSpec::field("status")),
    CollectionSpec::unstructured(ACTIVITY_LOG)
      .with_index(IndexSpec::on([("created_at", Desc)]))
      .with_index(IndexSpec::on([("action", SortOrder::Asc), ("created_at", Desc)]))
      .with_index(IndexSpec::field("profile_id")),
    CollectionSpec::unstructured(SESSION_STATE)
      .with_index(IndexSpec::field("key").unique()),
    CollectionSpec::unstructured(RATE_LIMITS)
      .with_index(
        IndexSpec::on([("action_type", SortOrder::Asc), ("date", SortOrder::Asc)]).unique(),
      )
      .with_index(IndexSpec::on([
        ("action_type", SortOrder::Asc),
        ("date", SortOrder::Asc),
        ("hour", SortOrder::Asc),
      ]))
      .with_index(IndexSpec::on([("action_type", SortOrder::Asc), ("week", SortOrder::Asc)])),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::check_catalog;

  #[test]
  fn default_catalog_is_well_formed() {
    let catalog = default_catalog();
    check_catalog(&catalog).unwrap();

    let names: Vec<_> = catalog.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, COLLECTION_NAMES);

    let validated: Vec<_> = catalog
      .iter()
      .filter(|c| c.validator.is_some())
      .map(|c| c.name.as_str())
      .collect();
    assert_eq!(validated, [PROFILES, CONNECTION_REQUESTS]);
  }

  #[test]
  fn required_fields_match_the_contract() {
    assert_eq!(
      profiles_validator().required,
      ["linkedin_id", "name", "url", "discovered_at"]
    );
    assert_eq!(
      connection_requests_validator().required,
      ["profile_id", "status", "sent_at"]
    );
  }

  #[test]
  fn status_enum_lists_all_six_values() {
    let v = connection_requests_validator();
    let allowed = v.properties["status"].allowed.clone().unwrap();
    assert_eq!(
      allowed,
      ["sent", "accepted", "rejected", "withdrawn", "pending", "failed"]
    );
  }
}
