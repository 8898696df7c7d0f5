//! One-shot provisioning of the outreach datastore.
//!
//! Loads [`SetupConfig`], opens the SQLite store it names and runs the schema
//! registrar against it. The binary in `main.rs` is a thin wrapper around
//! [`run`].

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use outreach_core::{
  registrar::{OnExisting, SchemaReport, ensure_default_schema},
  store::DocumentStore as _,
};
use outreach_store_sqlite::SqliteStore;
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `OUTREACH_STORAGE__DATABASE`.
pub const ENV_PREFIX: &str = "OUTREACH";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Setup configuration, deserialised from `config.toml` plus environment.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SetupConfig {
  #[serde(default)]
  pub on_existing: OnExisting,
  #[serde(default)]
  pub storage:     StorageConfig,
}

/// Where the datastore lives.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
  pub data_dir:        PathBuf,
  /// Database name; the file is `<data_dir>/<database>.sqlite3`.
  pub database:        String,
  pub timeout_seconds: u64,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      data_dir:        PathBuf::from("./data"),
      database:        "linkedin_automation".into(),
      timeout_seconds: 10,
    }
  }
}

impl StorageConfig {
  /// Path of the database file, with a leading `~` expanded.
  pub fn database_path(&self) -> Result<PathBuf, config::ConfigError> {
    let name = &self.database;
    if name.is_empty()
      || name.starts_with('.')
      || name.contains(['/', '\\'])
    {
      return Err(config::ConfigError::Message(format!(
        "storage.database must be a plain file name, got {name:?}"
      )));
    }
    Ok(expand_tilde(&self.data_dir).join(format!("{name}.sqlite3")))
  }

  pub fn busy_timeout(&self) -> Duration { Duration::from_secs(self.timeout_seconds) }
}

/// Load configuration from an optional TOML file at `path`, overlaid with
/// `OUTREACH_*` environment variables (`__` separates nested keys).
pub fn load_config(path: &Path) -> Result<SetupConfig, config::ConfigError> {
  load_config_with_env(path, None)
}

/// [`load_config`] with an explicit environment map instead of the process
/// environment.
pub fn load_config_with_env(
  path: &Path,
  env: Option<HashMap<String, String>>,
) -> Result<SetupConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .source(env),
    )
    .build()?
    .try_deserialize()
}

// ─── Run ──────────────────────────────────────────────────────────────────────

/// Open the configured datastore and provision every collection.
pub async fn run(cfg: &SetupConfig) -> anyhow::Result<SchemaReport> {
  let path = cfg.storage.database_path()?;

  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create data directory {parent:?}"))?;
  }

  tracing::info!(path = %path.display(), "opening datastore");
  let store = SqliteStore::open(&path, cfg.storage.busy_timeout())
    .await
    .with_context(|| format!("failed to open store at {path:?}"))?;
  store.ping().await.context("datastore did not answer")?;

  let report = ensure_default_schema(&store, cfg.on_existing)
    .await
    .context("failed to provision schema")?;

  tracing::info!(
    created = report.created.len(),
    skipped = report.skipped.len(),
    indexes = report.indexes.len(),
    "schema ensured"
  );
  Ok(report)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
