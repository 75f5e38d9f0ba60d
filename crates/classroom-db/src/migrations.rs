use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, channels, channel members)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                status      TEXT NOT NULL DEFAULT 'active',
                role        TEXT NOT NULL DEFAULT 'student'
                            CHECK (role IN ('teacher', 'staff', 'student')),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE channels (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                class_id    INTEGER NOT NULL UNIQUE,
                name        TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE channel_members (
                channel_id  INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                role        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (channel_id, user_id)
            );

            CREATE INDEX idx_channel_members_user ON channel_members(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
