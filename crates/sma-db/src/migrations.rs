use rusqlite::Connection;
use tracing::info;

use crate::Result;

const SCHEMA_V1: &str = "
    CREATE TABLE users (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        username        TEXT NOT NULL UNIQUE,
        email           TEXT NOT NULL UNIQUE,
        hashed_password TEXT NOT NULL,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE messages (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        content     TEXT NOT NULL,
        time_sent   INTEGER NOT NULL
    );

    CREATE TABLE conversations (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        sender_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        recipient_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        message_id      INTEGER NOT NULL UNIQUE REFERENCES messages(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_conversations_recipient ON conversations(recipient_id, sender_id);
    CREATE INDEX idx_conversations_sender ON conversations(sender_id);
    CREATE INDEX idx_messages_time_sent ON messages(time_sent);

    INSERT INTO schema_version (version) VALUES (1);
";

pub fn run(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, messages, conversations)");
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA_V1)?;
        tx.commit()?;
    }

    info!("Database migrations complete (schema v1)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testing::open_temp;
    use crate::{Database, DbOptions};

    #[test]
    fn reopening_does_not_rerun_migrations() {
        let (dir, db) = open_temp();
        drop(db);

        let db = Database::open(&dir.path().join("test.db"), &DbOptions::default()).unwrap();
        let versions: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(versions, 1);
    }
}
