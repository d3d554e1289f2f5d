//! SQL schema for the Wortschatz SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Never updated or deleted once inserted.
CREATE TABLE IF NOT EXISTS vocabulary_items (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    lemma    TEXT NOT NULL,
    pos_tag  TEXT NOT NULL,   -- UD tag, 'X' for anything else
    gender   TEXT NOT NULL,   -- 'masculine' | 'feminine' | 'neuter' | 'none'
    UNIQUE (lemma, pos_tag, gender)
);

CREATE TABLE IF NOT EXISTS documents (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    title            TEXT NOT NULL,
    raw_text         TEXT NOT NULL,
    complexity_score REAL NOT NULL
                     CHECK (complexity_score >= 0 AND complexity_score <= 99.99),
    created_at       TEXT NOT NULL,
    owner_id         INTEGER
);

CREATE TABLE IF NOT EXISTS token_relations (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id      INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    vocabulary_id    INTEGER NOT NULL REFERENCES vocabulary_items(id),
    position         INTEGER NOT NULL CHECK (position >= 0),
    grammatical_case TEXT NOT NULL,
    UNIQUE (document_id, position)
);

-- Mutated only by the review transaction.
CREATE TABLE IF NOT EXISTS knowledge_states (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         INTEGER NOT NULL,
    vocabulary_id   INTEGER NOT NULL REFERENCES vocabulary_items(id),
    retention_level INTEGER NOT NULL DEFAULT 0
                    CHECK (retention_level >= 0 AND retention_level <= 5),
    next_review_at  TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    updated_at      TEXT NOT NULL,
    UNIQUE (user_id, vocabulary_id)
);

-- Append-only.
CREATE TABLE IF NOT EXISTS review_events (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id                  INTEGER NOT NULL,
    knowledge_id             INTEGER NOT NULL REFERENCES knowledge_states(id),
    score                    INTEGER NOT NULL CHECK (score IN (1, 2, 3, 4)),
    previous_retention_level INTEGER NOT NULL,
    new_retention_level      INTEGER NOT NULL,
    previous_next_review_at  TEXT NOT NULL,
    new_next_review_at       TEXT NOT NULL,
    created_at               TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_profiles (
    user_id           INTEGER PRIMARY KEY,
    proficiency_level TEXT NOT NULL,   -- 'A1' | 'B1' | 'C1'
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS word_click_events (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id       INTEGER NOT NULL,
    document_id   INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    vocabulary_id INTEGER NOT NULL REFERENCES vocabulary_items(id),
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS translation_attempts (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id          INTEGER NOT NULL,
    challenge_pt     TEXT NOT NULL,
    attempt_de       TEXT NOT NULL,
    context_original TEXT NOT NULL DEFAULT '',
    is_correct       INTEGER NOT NULL,
    feedback         TEXT NOT NULL DEFAULT '',
    suggested_de     TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scenarios (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    text              TEXT NOT NULL UNIQUE,
    proficiency_level TEXT NOT NULL,
    is_active         INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS vocabulary_lemma_idx    ON vocabulary_items(lemma);
CREATE INDEX IF NOT EXISTS relations_vocab_idx     ON token_relations(vocabulary_id);
CREATE INDEX IF NOT EXISTS knowledge_due_idx       ON knowledge_states(user_id, next_review_at);
CREATE INDEX IF NOT EXISTS review_events_card_idx  ON review_events(knowledge_id);
CREATE INDEX IF NOT EXISTS scenarios_level_idx     ON scenarios(proficiency_level, is_active);

PRAGMA user_version = 1;
";
