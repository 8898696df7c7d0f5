//! SQL schema for the outreach SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per collection. A NULL validator means the collection is
-- unstructured.
CREATE TABLE IF NOT EXISTS collections (
    name           TEXT PRIMARY KEY,
    validator_json TEXT,             -- serialised Validator or NULL
    created_at     TEXT NOT NULL     -- ISO 8601 UTC
);

CREATE TABLE IF NOT EXISTS collection_indexes (
    collection TEXT NOT NULL REFERENCES collections(name),
    name       TEXT NOT NULL,
    sql_name   TEXT NOT NULL,        -- name of the backing SQLite index
    spec_json  TEXT NOT NULL,        -- serialised IndexSpec
    PRIMARY KEY (collection, name)
);

CREATE TABLE IF NOT EXISTS documents (
    document_id TEXT PRIMARY KEY,
    collection  TEXT NOT NULL REFERENCES collections(name),
    body_json   TEXT NOT NULL,
    inserted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents(collection);

PRAGMA user_version = 1;
";

/// Prefix of every SQLite index backing a collection index.
pub const INDEX_PREFIX: &str = "ix_";
