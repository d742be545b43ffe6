use droplink_sql::SQLStore;

use crate::service::DroplinkError;

/// Initialize the SQLite schema for all Droplink tables.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), DroplinkError> {
    sql.exec_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = "
-- Profiles: one per user, addressed by username.
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    pi_uid TEXT UNIQUE,
    plan TEXT NOT NULL DEFAULT 'free',
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Links: ordered by position within a profile.
CREATE TABLE IF NOT EXISTS links (
    id TEXT PRIMARY KEY,
    profile_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    clicks INTEGER NOT NULL DEFAULT 0,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_links_profile ON links(profile_id, position);

-- Analytics events: append-only.
CREATE TABLE IF NOT EXISTS analytics_events (
    id TEXT PRIMARY KEY,
    profile_id TEXT NOT NULL,
    link_id TEXT,
    kind TEXT NOT NULL,
    referrer TEXT,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_events_profile_time ON analytics_events(profile_id, created_at);

-- Tips: one per Pi payment.
CREATE TABLE IF NOT EXISTS tips (
    id TEXT PRIMARY KEY,
    profile_id TEXT NOT NULL,
    payment_id TEXT UNIQUE,
    status TEXT NOT NULL,
    amount REAL NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_tips_profile ON tips(profile_id, status);

-- Forum categories.
CREATE TABLE IF NOT EXISTS forum_categories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    position INTEGER NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Forum topics. Counters live in columns and are bumped in place.
CREATE TABLE IF NOT EXISTS forum_topics (
    id TEXT PRIMARY KEY,
    category_id TEXT NOT NULL,
    author_id TEXT NOT NULL,
    pinned INTEGER NOT NULL DEFAULT 0,
    locked INTEGER NOT NULL DEFAULT 0,
    reply_count INTEGER NOT NULL DEFAULT 0,
    view_count INTEGER NOT NULL DEFAULT 0,
    last_activity_at TEXT NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (category_id) REFERENCES forum_categories(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_topics_category ON forum_topics(category_id, pinned, last_activity_at);

CREATE TABLE IF NOT EXISTS forum_replies (
    id TEXT PRIMARY KEY,
    topic_id TEXT NOT NULL,
    author_id TEXT NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (topic_id) REFERENCES forum_topics(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_replies_topic ON forum_replies(topic_id, created_at);

-- Sessions: bearer token issuance records.
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    profile_id TEXT NOT NULL,
    revoked INTEGER NOT NULL DEFAULT 0,
    data TEXT NOT NULL,
    issued_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_sessions_profile ON sessions(profile_id);
";

#[cfg(test)]
mod tests {
    use super::*;
    use droplink_sql::SqliteStore;

    #[test]
    fn schema_is_idempotent() {
        let sql = SqliteStore::open_in_memory().unwrap();
        init_schema(&sql).unwrap();
        init_schema(&sql).unwrap();
        let row = sql
            .query_one(
                "SELECT COUNT(*) AS cnt FROM sqlite_master WHERE type = 'table'",
                &[],
            )
            .unwrap()
            .unwrap();
        assert_eq!(row.get_i64("cnt"), Some(8));
    }
}
