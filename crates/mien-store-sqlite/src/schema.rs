//! SQL schema for the Mien SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated
//! on the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- At most one row has is_active = 1; the guard is an application-level
-- transaction in save_config, not a trigger, so it stays visible and
-- testable.
CREATE TABLE IF NOT EXISTS study_configs (
    config_id             TEXT PRIMARY KEY,
    min_images            INTEGER NOT NULL,
    max_images            INTEGER NOT NULL,
    max_ratings_per_image INTEGER NOT NULL,
    is_active             INTEGER NOT NULL DEFAULT 0,
    created_at            TEXT NOT NULL
);

-- Per-image rating capacity is live-counted from ratings; there is no
-- is_rated flag.
CREATE TABLE IF NOT EXISTS images (
    image_id     TEXT PRIMARY KEY,
    code         TEXT NOT NULL UNIQUE,   -- 'IMG-' + 8 hex, assigned once
    storage_path TEXT NOT NULL,          -- path below the media root
    uploaded_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS emotions (
    emotion_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS participants (
    participant_id  TEXT PRIMARY KEY,
    email           TEXT NOT NULL UNIQUE,
    created_at      TEXT NOT NULL,
    last_session_at TEXT                 -- stamped on session completion
);

CREATE TABLE IF NOT EXISTS ratings (
    rating_id      TEXT PRIMARY KEY,
    participant_id TEXT NOT NULL REFERENCES participants(participant_id),
    image_id       TEXT NOT NULL REFERENCES images(image_id) ON DELETE CASCADE,
    created_at     TEXT NOT NULL,
    UNIQUE (participant_id, image_id)
);

CREATE TABLE IF NOT EXISTS ranking_entries (
    rating_id  TEXT NOT NULL REFERENCES ratings(rating_id)   ON DELETE CASCADE,
    emotion_id TEXT NOT NULL REFERENCES emotions(emotion_id) ON DELETE CASCADE,
    agreement  TEXT NOT NULL,            -- canonical two-decimal form
    PRIMARY KEY (rating_id, emotion_id)
);

-- Server-side browser-session state, keyed by the cookie token.
CREATE TABLE IF NOT EXISTS sessions (
    token          TEXT PRIMARY KEY,
    participant_id TEXT NOT NULL REFERENCES participants(participant_id),
    target_len     INTEGER NOT NULL,
    rated          TEXT NOT NULL DEFAULT '[]',   -- JSON array of image ids
    started_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ratings_image_idx       ON ratings(image_id);
CREATE INDEX IF NOT EXISTS ratings_participant_idx ON ratings(participant_id);
CREATE INDEX IF NOT EXISTS ratings_created_idx     ON ratings(created_at);
CREATE INDEX IF NOT EXISTS entries_emotion_idx     ON ranking_entries(emotion_id);

PRAGMA user_version = 1;
";
