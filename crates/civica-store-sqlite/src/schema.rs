//! SQL schema for the Civica SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS citizens (
    citizen_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- Read-only for the workflow. Reports reference staff by username without
-- a foreign key, so removing a staff member never touches reports.
CREATE TABLE IF NOT EXISTS staff (
    username  TEXT PRIMARY KEY,
    role      TEXT NOT NULL,               -- 'admin' | 'mpro' | 'tosm' | 'em'
    offices   TEXT NOT NULL DEFAULT '[]'   -- JSON array of category codes
);

CREATE TABLE IF NOT EXISTS reports (
    report_id           INTEGER PRIMARY KEY AUTOINCREMENT,
    citizen_id          INTEGER REFERENCES citizens(citizen_id) ON DELETE SET NULL,
    title               TEXT NOT NULL,
    description         TEXT NOT NULL,
    category            TEXT NOT NULL,
    latitude            REAL NOT NULL,
    longitude           REAL NOT NULL,
    anonymous           INTEGER NOT NULL DEFAULT 0,
    photo1              TEXT NOT NULL,
    photo2              TEXT,
    photo3              TEXT,
    status              TEXT NOT NULL DEFAULT 'pending',
    assigned_staff      TEXT,
    assigned_maintainer TEXT,
    comment             TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    version             INTEGER NOT NULL DEFAULT 0,
    CHECK (assigned_maintainer IS NULL OR assigned_staff IS NOT NULL),
    CHECK (status != 'rejected' OR length(trim(coalesce(comment, ''))) > 0)
);

-- Messages are strictly append-only.
CREATE TABLE IF NOT EXISTS messages (
    message_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id     INTEGER NOT NULL REFERENCES reports(report_id) ON DELETE CASCADE,
    author_staff  TEXT,                    -- NULL: the report's citizen
    body          TEXT NOT NULL CHECK (length(body) > 0),
    is_private    INTEGER NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id        INTEGER NOT NULL REFERENCES reports(report_id) ON DELETE CASCADE,
    citizen_id       INTEGER REFERENCES citizens(citizen_id) ON DELETE CASCADE,
    staff_username   TEXT,
    title            TEXT NOT NULL,
    body             TEXT NOT NULL,
    is_read          INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    CHECK ((citizen_id IS NULL) != (staff_username IS NULL))
);

CREATE INDEX IF NOT EXISTS reports_status_idx        ON reports(status);
CREATE INDEX IF NOT EXISTS reports_staff_idx         ON reports(assigned_staff);
CREATE INDEX IF NOT EXISTS messages_report_idx       ON messages(report_id, created_at, message_id);
CREATE INDEX IF NOT EXISTS notifications_citizen_idx ON notifications(citizen_id);
CREATE INDEX IF NOT EXISTS notifications_staff_idx   ON notifications(staff_username);

PRAGMA user_version = 1;
";
