//! SQL schema for the Menagerie SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Subjects and locations are independently persisted aggregates: the
-- favorite relation is stored redundantly on both sides as JSON id arrays,
-- and location_ref is deliberately not a foreign key (dual-write model,
-- no cross-aggregate atomicity).
CREATE TABLE IF NOT EXISTS subjects (
    subject_id   TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    located      TEXT NOT NULL,               -- ISO 8601 date
    location_ref TEXT,                        -- locations.location_id or NULL
    favorites    TEXT NOT NULL DEFAULT '[]',  -- JSON array of location UUIDs
    created      TEXT NOT NULL,
    updated      TEXT NOT NULL,
    version      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS locations (
    location_id  TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    favorited_by TEXT NOT NULL DEFAULT '[]',  -- JSON array of subject UUIDs
    created      TEXT NOT NULL,
    updated      TEXT NOT NULL,
    version      INTEGER NOT NULL DEFAULT 0
);

-- One row per claimed idempotency key. Rows older than the retention
-- window are invisible to claims and purged opportunistically.
CREATE TABLE IF NOT EXISTS idempotency (
    key        TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS subjects_location_idx   ON subjects(location_ref);
CREATE INDEX IF NOT EXISTS idempotency_created_idx ON idempotency(created_at);

PRAGMA user_version = 1;
";
