//! SQL schema for the Accord SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    email         TEXT UNIQUE,
    name          TEXT,
    image         TEXT,
    password_hash TEXT,            -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Rows are never deleted; only is_current changes, via publish.
CREATE TABLE IF NOT EXISTS terms (
    id             TEXT PRIMARY KEY,
    version        TEXT NOT NULL UNIQUE,
    content        TEXT NOT NULL,
    effective_date TEXT NOT NULL,
    is_current     INTEGER NOT NULL DEFAULT 0 CHECK (is_current IN (0, 1))
);

-- At most one current version.
CREATE UNIQUE INDEX IF NOT EXISTS terms_single_current_idx
    ON terms(is_current) WHERE is_current = 1;

-- Append-only.
CREATE TABLE IF NOT EXISTS user_terms_acceptances (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(id),
    terms_id    TEXT NOT NULL REFERENCES terms(id),
    ip_address  TEXT NOT NULL,
    accepted_at TEXT NOT NULL,
    UNIQUE (user_id, terms_id)
);

CREATE TABLE IF NOT EXISTS magic_links (
    token_hash  TEXT PRIMARY KEY,  -- sha256 hex of the emailed token
    email       TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL,
    consumed_at TEXT
);

CREATE INDEX IF NOT EXISTS acceptances_user_idx ON user_terms_acceptances(user_id);
CREATE INDEX IF NOT EXISTS terms_effective_idx  ON terms(effective_date);

PRAGMA user_version = 1;
";
