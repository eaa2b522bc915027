//! SQL schema for the onboarding SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS onboardings (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,  -- arrival order
    id             TEXT NOT NULL UNIQUE,
    employee_id    INTEGER NOT NULL,
    employee_name  TEXT NOT NULL,
    client_name    TEXT NOT NULL,
    account_number TEXT NOT NULL,
    date           TEXT NOT NULL,   -- YYYY-MM-DD, or raw text from legacy imports
    month          TEXT NOT NULL,   -- always substr(date, 1, 7)
    session_number INTEGER NOT NULL DEFAULT 1 CHECK (session_number >= 1),
    attendance     TEXT NOT NULL DEFAULT 'pending',
    notes          TEXT,
    no_show        TEXT,            -- JSON-encoded follow-up or NULL
    created_at     TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    updated_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS onboardings_employee_idx ON onboardings(employee_id);
CREATE INDEX IF NOT EXISTS onboardings_month_idx    ON onboardings(month);
CREATE INDEX IF NOT EXISTS onboardings_account_idx  ON onboardings(account_number);
CREATE INDEX IF NOT EXISTS onboardings_date_idx     ON onboardings(date);

PRAGMA user_version = 1;
";
