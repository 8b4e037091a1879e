//! SQL schema for the marathon SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Per-photo state ────────────────────────────────────────────────────────
-- Written by the upload, exif and thumbnail pipelines; every write is an
-- upsert on the (domain, reference, order_index) key.

CREATE TABLE IF NOT EXISTS participant_states (
    domain            TEXT NOT NULL,
    reference         TEXT NOT NULL,
    processed_indexes TEXT NOT NULL,   -- JSON array, one flag per slot
    PRIMARY KEY (domain, reference)
);

CREATE TABLE IF NOT EXISTS slot_states (
    domain         TEXT    NOT NULL,
    reference      TEXT    NOT NULL,
    order_index    INTEGER NOT NULL,
    uploaded       INTEGER NOT NULL DEFAULT 0,
    thumbnail_key  TEXT,
    exif_processed INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (domain, reference, order_index)
);

CREATE TABLE IF NOT EXISTS exif_states (
    domain      TEXT    NOT NULL,
    reference   TEXT    NOT NULL,
    order_index INTEGER NOT NULL,
    exif_json   TEXT    NOT NULL,      -- sanitized JSON object
    PRIMARY KEY (domain, reference, order_index)
);

-- ── Durable records ────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS marathons (
    marathon_id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain      TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS topics (
    topic_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    marathon_id INTEGER NOT NULL REFERENCES marathons(marathon_id),
    order_index INTEGER NOT NULL,
    name        TEXT    NOT NULL,
    UNIQUE (marathon_id, order_index)
);

CREATE TABLE IF NOT EXISTS participants (
    participant_id INTEGER PRIMARY KEY AUTOINCREMENT,
    marathon_id    INTEGER NOT NULL REFERENCES marathons(marathon_id),
    reference      TEXT    NOT NULL,
    status         TEXT    NOT NULL DEFAULT 'initialized',
    upload_count   INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT    NOT NULL,
    UNIQUE (marathon_id, reference)
);

CREATE TABLE IF NOT EXISTS submissions (
    submission_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    participant_id INTEGER NOT NULL REFERENCES participants(participant_id),
    topic_id       INTEGER NOT NULL REFERENCES topics(topic_id),
    status         TEXT    NOT NULL DEFAULT 'initialized',
    key            TEXT,
    thumbnail_key  TEXT,
    preview_key    TEXT,
    exif_json      TEXT    NOT NULL DEFAULT '{}',
    size           INTEGER,
    mime_type      TEXT,
    uploaded       INTEGER NOT NULL DEFAULT 0,
    UNIQUE (participant_id, topic_id)
);

CREATE TABLE IF NOT EXISTS rule_configs (
    rule_config_id INTEGER PRIMARY KEY AUTOINCREMENT,
    marathon_id    INTEGER NOT NULL REFERENCES marathons(marathon_id),
    rule_key       TEXT    NOT NULL,
    severity       TEXT    NOT NULL,
    params_json    TEXT    NOT NULL DEFAULT '{}',
    enabled        INTEGER NOT NULL DEFAULT 1,
    UNIQUE (marathon_id, rule_key)
);

-- Replaced wholesale on every validation run; never patched.
CREATE TABLE IF NOT EXISTS validation_results (
    validation_result_id INTEGER PRIMARY KEY AUTOINCREMENT,
    participant_id       INTEGER NOT NULL REFERENCES participants(participant_id),
    position             INTEGER NOT NULL,
    rule_key             TEXT    NOT NULL,
    severity             TEXT    NOT NULL,
    outcome              TEXT    NOT NULL,   -- 'passed' | 'failed'
    message              TEXT    NOT NULL,
    file_name            TEXT
);

CREATE INDEX IF NOT EXISTS submissions_participant_idx ON submissions(participant_id);
CREATE INDEX IF NOT EXISTS results_participant_idx     ON validation_results(participant_id);

PRAGMA user_version = 1;
";
