//! SQL schema for the Stride SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Identifiers come from `INTEGER PRIMARY KEY AUTOINCREMENT` — a
/// storage-enforced atomic counter, so concurrent inserts can never race
/// their way into a duplicate id. The `revision` column on `kpis` backs the
/// optimistic per-KPI write check.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS categories (
    category_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS users (
    user_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email    TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS kpis (
    kpi_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    title         TEXT NOT NULL,
    description   TEXT,
    category_id   INTEGER NOT NULL REFERENCES categories(category_id),
    target_value  REAL NOT NULL CHECK (target_value >= 0),
    actual_value  REAL NOT NULL DEFAULT 0 CHECK (actual_value >= 0),
    status        TEXT NOT NULL,   -- 'On Track' | 'At Risk' | 'Off Track'
    assigned_user INTEGER NOT NULL REFERENCES users(user_id),
    start_date    TEXT NOT NULL,   -- RFC 3339 UTC
    end_date      TEXT NOT NULL,
    revision      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Update records are strictly append-only.
-- No UPDATE is ever issued against this table; DELETE happens only as part
-- of a KPI's cascade.
CREATE TABLE IF NOT EXISTS kpi_updates (
    update_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    kpi_id        INTEGER NOT NULL REFERENCES kpis(kpi_id),
    updated_value REAL NOT NULL CHECK (updated_value >= 0),
    comment       TEXT,
    updated_by    INTEGER NOT NULL REFERENCES users(user_id),
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS kpis_status_idx     ON kpis(status);
CREATE INDEX IF NOT EXISTS kpis_user_idx       ON kpis(assigned_user);
CREATE INDEX IF NOT EXISTS kpis_category_idx   ON kpis(category_id);
CREATE INDEX IF NOT EXISTS kpis_end_idx        ON kpis(end_date);
CREATE INDEX IF NOT EXISTS updates_kpi_idx     ON kpi_updates(kpi_id);
CREATE INDEX IF NOT EXISTS updates_user_idx    ON kpi_updates(updated_by);
CREATE INDEX IF NOT EXISTS updates_created_idx ON kpi_updates(created_at);

PRAGMA user_version = 1;
";
