//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use chrono::Utc;
use outreach_core::{
  Error as CoreError,
  catalog::{
    ACTIVITY_LOG, COLLECTION_NAMES, CONNECTION_REQUESTS, MESSAGES, PROFILES,
    SESSION_STATE,
  },
  date,
  model::{ActivityLogEntry, ConnectionRequest, Profile, Record as _, RequestStatus},
  registrar::{OnExisting, ensure_default_schema},
  schema::{IndexSpec, PropertySchema, Validator},
  store::DocumentStore,
  validate::ViolationKind,
};
use serde_json::json;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn provisioned() -> SqliteStore {
  let s = store().await;
  ensure_default_schema(&s, OnExisting::Skip)
    .await
    .expect("schema provisioned");
  s
}

fn core(err: Error) -> CoreError {
  match err {
    Error::Core(e) => e,
    other => panic!("expected a core error, got {other:?}"),
  }
}

// ─── Registrar against SQLite ────────────────────────────────────────────────

#[tokio::test]
async fn fresh_database_gets_six_collections_two_validated() {
  let s = store().await;
  assert!(s.list_collections().await.unwrap().is_empty());

  let report = ensure_default_schema(&s, OnExisting::Skip).await.unwrap();
  assert_eq!(report.created, COLLECTION_NAMES);

  let infos = s.list_collections().await.unwrap();
  let mut names: Vec<_> = infos.iter().map(|c| c.name.as_str()).collect();
  names.sort_unstable();
  let mut expected = COLLECTION_NAMES;
  expected.sort_unstable();
  assert_eq!(names, expected);

  let validated: Vec<_> = infos
    .iter()
    .filter(|c| c.validator.is_some())
    .map(|c| c.name.as_str())
    .collect();
  assert_eq!(validated, [CONNECTION_REQUESTS, PROFILES]);
}

#[tokio::test]
async fn stored_validator_roundtrips() {
  let s = provisioned().await;
  let infos = s.list_collections().await.unwrap();
  let profiles = infos.iter().find(|c| c.name == PROFILES).unwrap();
  assert_eq!(
    profiles.validator.as_ref(),
    Some(&outreach_core::catalog::profiles_validator())
  );
}

#[tokio::test]
async fn rerun_with_skip_is_a_no_op() {
  let s = provisioned().await;
  let report = ensure_default_schema(&s, OnExisting::Skip).await.unwrap();
  assert!(report.created.is_empty());
  assert_eq!(report.skipped, COLLECTION_NAMES);
  assert_eq!(s.list_collections().await.unwrap().len(), 6);
}

#[tokio::test]
async fn rerun_with_strict_fails_on_first_collection() {
  let s = provisioned().await;
  let err = ensure_default_schema(&s, OnExisting::Strict)
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::AlreadyExists(name) if name == PROFILES));
}

#[tokio::test]
async fn indexes_are_provisioned_once() {
  let s = provisioned().await;
  ensure_default_schema(&s, OnExisting::Skip).await.unwrap();

  assert_eq!(
    s.list_indexes(PROFILES).await.unwrap(),
    ["discovered_at_-1", "linkedin_id_1", "tags_1", "url_1"]
  );
  assert_eq!(s.list_indexes(SESSION_STATE).await.unwrap(), ["key_1"]);
}

// ─── Profile validation ──────────────────────────────────────────────────────

#[tokio::test]
async fn valid_profile_is_accepted() {
  let s = provisioned().await;
  let doc = json!({
    "linkedin_id":   "abc123",
    "name":          "Jane Doe",
    "url":           "https://www.linkedin.com/in/janedoe",
    "discovered_at": date::to_value(Utc::now()),
  });

  let id = s.insert_document(PROFILES, doc).await.unwrap();

  let found = s
    .find_one(PROFILES, "linkedin_id", &json!("abc123"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.document_id, id);
  assert_eq!(found.body["name"], "Jane Doe");
  assert_eq!(s.count_documents(PROFILES).await.unwrap(), 1);
}

#[tokio::test]
async fn profile_missing_linkedin_id_is_rejected() {
  let s = provisioned().await;
  let doc = json!({
    "name":          "Jane Doe",
    "url":           "https://www.linkedin.com/in/janedoe",
    "discovered_at": date::to_value(Utc::now()),
  });

  let err = core(s.insert_document(PROFILES, doc).await.unwrap_err());
  match err {
    CoreError::Validation { collection, violations } => {
      assert_eq!(collection, PROFILES);
      assert_eq!(violations.0.len(), 1);
      assert_eq!(violations.0[0].field, "linkedin_id");
      assert_eq!(violations.0[0].kind, ViolationKind::Missing);
    }
    other => panic!("expected validation error, got {other:?}"),
  }
  assert_eq!(s.count_documents(PROFILES).await.unwrap(), 0);
}

#[tokio::test]
async fn dropping_any_required_field_is_rejected() {
  let s = provisioned().await;
  let profile = json!({
    "linkedin_id":   "abc123",
    "name":          "Jane Doe",
    "url":           "https://www.linkedin.com/in/janedoe",
    "discovered_at": date::to_value(Utc::now()),
  });
  let request = json!({
    "profile_id": "abc123",
    "status":     "pending",
    "sent_at":    date::to_value(Utc::now()),
  });

  let cases = [
    (PROFILES, &profile, "linkedin_id"),
    (PROFILES, &profile, "name"),
    (PROFILES, &profile, "url"),
    (PROFILES, &profile, "discovered_at"),
    (CONNECTION_REQUESTS, &request, "profile_id"),
    (CONNECTION_REQUESTS, &request, "status"),
    (CONNECTION_REQUESTS, &request, "sent_at"),
  ];
  for (collection, full, field) in cases {
    let mut doc = full.clone();
    doc.as_object_mut().unwrap().remove(field);

    let err = core(s.insert_document(collection, doc).await.unwrap_err());
    match err {
      CoreError::Validation { violations, .. } => {
        assert_eq!(violations.0.len(), 1, "{collection} without {field}");
        assert_eq!(violations.0[0].field, field);
        assert_eq!(violations.0[0].kind, ViolationKind::Missing);
      }
      other => panic!("{collection} without {field}: expected validation error, got {other:?}"),
    }
  }

  assert_eq!(s.count_documents(PROFILES).await.unwrap(), 0);
  assert_eq!(s.count_documents(CONNECTION_REQUESTS).await.unwrap(), 0);
}

#[tokio::test]
async fn profile_with_string_timestamp_is_rejected() {
  let s = provisioned().await;
  let doc = json!({
    "linkedin_id":   "abc123",
    "name":          "Jane Doe",
    "url":           "https://www.linkedin.com/in/janedoe",
    "discovered_at": "2024-01-01T00:00:00Z",
  });

  let err = core(s.insert_document(PROFILES, doc).await.unwrap_err());
  assert!(
    matches!(err, CoreError::Validation { ref violations, .. } if violations.touches("discovered_at"))
  );
}

#[tokio::test]
async fn profile_with_empty_name_is_rejected() {
  let s = provisioned().await;
  let mut profile = Profile::new("abc123", "", "https://www.linkedin.com/in/x");
  profile.company = Some("Acme".into());

  let err = core(
    s.insert_document(PROFILES, profile.to_document().unwrap())
      .await
      .unwrap_err(),
  );
  assert!(
    matches!(err, CoreError::Validation { ref violations, .. } if violations.touches("name"))
  );
}

#[tokio::test]
async fn duplicate_linkedin_id_hits_unique_index() {
  let s = provisioned().await;
  let first = Profile::new("abc123", "Jane Doe", "https://www.linkedin.com/in/jane");
  let second = Profile::new("abc123", "Jane D.", "https://www.linkedin.com/in/jane-2");

  s.insert_document(PROFILES, first.to_document().unwrap())
    .await
    .unwrap();
  let err = core(
    s.insert_document(PROFILES, second.to_document().unwrap())
      .await
      .unwrap_err(),
  );
  assert!(matches!(
    err,
    CoreError::DuplicateKey { ref collection, ref index }
      if collection == PROFILES && index == "linkedin_id_1"
  ));
  assert_eq!(s.count_documents(PROFILES).await.unwrap(), 1);
}

#[tokio::test]
async fn typed_profile_roundtrips_through_the_store() {
  let s = provisioned().await;
  let mut profile = Profile::new("p-1", "Ada", "https://www.linkedin.com/in/ada");
  profile.tags = vec!["engineering".into(), "london".into()];
  profile.updated_at = Some(date::now());

  s.insert_document(PROFILES, profile.to_document().unwrap())
    .await
    .unwrap();
  let found = s
    .find_one(PROFILES, "url", &json!("https://www.linkedin.com/in/ada"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(Profile::from_document(found.body).unwrap(), profile);
}

// ─── ConnectionRequest validation ────────────────────────────────────────────

#[tokio::test]
async fn request_with_unknown_status_is_rejected() {
  let s = provisioned().await;
  let doc = json!({
    "profile_id": "abc123",
    "status":     "maybe",
    "sent_at":    date::to_value(Utc::now()),
  });

  let err = core(s.insert_document(CONNECTION_REQUESTS, doc).await.unwrap_err());
  match err {
    CoreError::Validation { violations, .. } => {
      assert_eq!(
        violations.0[0].kind,
        ViolationKind::NotInEnum { value: "maybe".into() }
      );
    }
    other => panic!("expected validation error, got {other:?}"),
  }
}

#[tokio::test]
async fn request_with_sent_status_is_accepted() {
  let s = provisioned().await;
  let doc = json!({
    "profile_id": "abc123",
    "status":     "sent",
    "sent_at":    date::to_value(Utc::now()),
  });
  s.insert_document(CONNECTION_REQUESTS, doc).await.unwrap();
  assert_eq!(s.count_documents(CONNECTION_REQUESTS).await.unwrap(), 1);
}

#[tokio::test]
async fn every_status_value_is_accepted() {
  use strum::IntoEnumIterator as _;

  let s = provisioned().await;
  for (i, status) in RequestStatus::iter().enumerate() {
    let mut request = ConnectionRequest::sent(format!("profile-{i}"));
    request.status = status;
    s.insert_document(CONNECTION_REQUESTS, request.to_document().unwrap())
      .await
      .unwrap();
  }
  assert_eq!(s.count_documents(CONNECTION_REQUESTS).await.unwrap(), 6);

  let found = s
    .find_one(CONNECTION_REQUESTS, "status", &json!("withdrawn"))
    .await
    .unwrap()
    .unwrap();
  let request = ConnectionRequest::from_document(found.body).unwrap();
  assert_eq!(request.status, RequestStatus::Withdrawn);
  assert!(request.status.is_terminal());
}

// ─── Unstructured collections ────────────────────────────────────────────────

#[tokio::test]
async fn unstructured_collections_accept_any_object() {
  let s = provisioned().await;
  s.insert_document(MESSAGES, json!({ "anything": [1, 2, 3] }))
    .await
    .unwrap();

  let entry = ActivityLogEntry {
    action:      "search".into(),
    profile_id:  None,
    details:     Default::default(),
    success:     true,
    duration_ms: Some(1200),
    created_at:  date::now(),
  };
  s.insert_document(ACTIVITY_LOG, entry.to_document().unwrap())
    .await
    .unwrap();

  let found = s
    .find_one(ACTIVITY_LOG, "success", &json!(true))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(ActivityLogEntry::from_document(found.body).unwrap(), entry);
}

#[tokio::test]
async fn non_object_documents_are_rejected_everywhere() {
  let s = provisioned().await;
  let err = core(s.insert_document(MESSAGES, json!("hello")).await.unwrap_err());
  assert!(matches!(
    err,
    CoreError::Validation { ref violations, .. } if violations.touches("$root")
  ));
}

#[tokio::test]
async fn session_keys_are_unique() {
  let s = provisioned().await;
  s.insert_document(SESSION_STATE, json!({ "key": "cookies", "value": "a" }))
    .await
    .unwrap();
  let err = core(
    s.insert_document(SESSION_STATE, json!({ "key": "cookies", "value": "b" }))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, CoreError::DuplicateKey { ref index, .. } if index == "key_1"));
}

#[tokio::test]
async fn missing_unique_key_counts_once() {
  let s = provisioned().await;
  s.insert_document(SESSION_STATE, json!({ "value": "a" }))
    .await
    .unwrap();
  let err = core(
    s.insert_document(SESSION_STATE, json!({ "value": "b" }))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, CoreError::DuplicateKey { ref index, .. } if index == "key_1"));

  let err = core(
    s.insert_document(SESSION_STATE, json!({ "key": null, "value": "c" }))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, CoreError::DuplicateKey { .. }), "explicit null collides with missing");

  s.insert_document(SESSION_STATE, json!({ "key": "null", "value": "d" }))
    .await
    .unwrap();
  assert_eq!(s.count_documents(SESSION_STATE).await.unwrap(), 2);
}

#[tokio::test]
async fn find_one_by_date_value() {
  let s = provisioned().await;
  let at = date::to_value(Utc::now());
  s.insert_document(MESSAGES, json!({ "sent_at": at.clone(), "n": 1 }))
    .await
    .unwrap();
  s.insert_document(MESSAGES, json!({ "sent_at": at.clone(), "n": 2 }))
    .await
    .unwrap();

  let found = s.find_one(MESSAGES, "sent_at", &at).await.unwrap().unwrap();
  assert_eq!(found.body["n"], 1, "earliest insert wins");
  assert!(
    s.find_one(MESSAGES, "n", &json!(3)).await.unwrap().is_none()
  );
}

#[tokio::test]
async fn typed_request_found_by_its_encoded_timestamp() {
  let s = provisioned().await;
  let request = ConnectionRequest::sent("abc123");
  s.insert_document(CONNECTION_REQUESTS, request.to_document().unwrap())
    .await
    .unwrap();

  let found = s
    .find_one(CONNECTION_REQUESTS, "sent_at", &date::to_value(request.sent_at))
    .await
    .unwrap()
    .expect("typed and hand-built timestamps share one encoding");
  assert_eq!(ConnectionRequest::from_document(found.body).unwrap(), request);

  let profile = Profile::new("abc123", "Jane Doe", "https://www.linkedin.com/in/jane");
  s.insert_document(PROFILES, profile.to_document().unwrap())
    .await
    .unwrap();
  assert!(
    s.find_one(PROFILES, "discovered_at", &date::to_value(profile.discovered_at))
      .await
      .unwrap()
      .is_some()
  );
}

// ─── Catalog errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_collection_twice_reports_already_exists() {
  let s = store().await;
  s.create_collection("things", None).await.unwrap();
  let err = core(s.create_collection("things", None).await.unwrap_err());
  assert!(matches!(err, CoreError::AlreadyExists(name) if name == "things"));
}

#[tokio::test]
async fn malformed_names_and_validators_are_spec_errors() {
  let s = store().await;

  let err = core(s.create_collection("x; DROP TABLE documents", None).await.unwrap_err());
  assert!(matches!(err, CoreError::ValidationSpec(_)));

  let mut bad = Validator::object().require("a", PropertySchema::string());
  bad.required.push("b".into());
  let err = core(s.create_collection("things", Some(&bad)).await.unwrap_err());
  assert!(matches!(err, CoreError::ValidationSpec(_)));

  assert!(s.list_collections().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_collections_are_never_created_implicitly() {
  let s = store().await;
  let err = core(s.insert_document("ghosts", json!({})).await.unwrap_err());
  assert!(matches!(err, CoreError::CollectionNotFound(name) if name == "ghosts"));

  let err = core(
    s.create_index("ghosts", &IndexSpec::field("a"))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, CoreError::CollectionNotFound(_)));

  let err = core(s.find_one("ghosts", "a", &json!(1)).await.unwrap_err());
  assert!(matches!(err, CoreError::CollectionNotFound(_)));
  let err = core(s.count_documents("ghosts").await.unwrap_err());
  assert!(matches!(err, CoreError::CollectionNotFound(_)));

  assert!(s.list_collections().await.unwrap().is_empty());
}

// ─── File-backed store ───────────────────────────────────────────────────────

#[tokio::test]
async fn file_store_persists_schema_across_reopen() {
  let dir = std::env::temp_dir().join(format!("outreach-store-{}", uuid::Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("linkedin_automation.sqlite3");

  {
    let s = SqliteStore::open(&path, Duration::from_secs(1)).await.unwrap();
    s.ping().await.unwrap();
    ensure_default_schema(&s, OnExisting::Skip).await.unwrap();
  }

  let s = SqliteStore::open(&path, Duration::from_secs(1)).await.unwrap();
  let report = ensure_default_schema(&s, OnExisting::Skip).await.unwrap();
  assert!(report.created.is_empty());
  assert_eq!(report.skipped.len(), 6);

  drop(s);
  let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn unreachable_path_is_a_connection_error() {
  let path = std::env::temp_dir()
    .join(format!("outreach-missing-{}", uuid::Uuid::new_v4()))
    .join("nested")
    .join("db.sqlite3");

  let err = match SqliteStore::open(&path, Duration::from_millis(10)).await {
    Ok(_) => panic!("opening {path:?} should fail"),
    Err(e) => e,
  };
  assert!(matches!(core(err), CoreError::Connection(_)));
}
