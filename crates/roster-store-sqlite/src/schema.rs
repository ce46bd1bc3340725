//! SQL schema for the Roster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS organisations (
    organisation_id TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

-- Sign-in records. `metadata` is the JSON claims bag handed to the resolver.
CREATE TABLE IF NOT EXISTS accounts (
    subject_id      TEXT PRIMARY KEY,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash   TEXT NOT NULL,   -- argon2 PHC string
    email_confirmed INTEGER NOT NULL DEFAULT 1,
    metadata        TEXT NOT NULL DEFAULT '{}',
    created_at      TEXT NOT NULL
);

-- Only the SHA-256 of each access token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL REFERENCES accounts(subject_id) ON DELETE CASCADE,
    issued_at  TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

-- Role, status and organisation are free text, as written by operators.
-- organisation_id is not a foreign key; it may name an organisation that
-- does not exist yet.
CREATE TABLE IF NOT EXISTS profiles (
    subject_id      TEXT PRIMARY KEY,
    full_name       TEXT,
    email           TEXT,
    role            TEXT,
    organisation_id TEXT,
    mobile          TEXT,
    status          TEXT
);

CREATE TABLE IF NOT EXISTS members (
    member_id       TEXT PRIMARY KEY,
    full_name       TEXT NOT NULL,
    organisation_id TEXT,
    registered_by   TEXT NOT NULL,
    registered_at   TEXT NOT NULL    -- fixed-width RFC 3339 UTC, sortable
);

CREATE INDEX IF NOT EXISTS sessions_subject_idx    ON sessions(subject_id);
CREATE INDEX IF NOT EXISTS members_registered_idx ON members(registered_at);

PRAGMA user_version = 1;
";
