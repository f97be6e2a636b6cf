use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use sma_types::models::{ConversationMessage, UserId};
use tracing::info;

use crate::models::{MessageRow, UserRow, timestamp_column, user_id_column};
use crate::{Database, DbError, Result};

/// Longest preview kept before the ellipsis is appended.
const PREVIEW_CHARS: usize = 20;

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<UserId> {
        let id = self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, hashed_password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            Ok(UserId::new(conn.last_insert_rowid())?)
        })?;
        info!("Created user {} ({})", username, id);
        Ok(id)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: UserId) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id.get()))
    }

    /// Username/email of every account. Fine for a small server; there is no
    /// friend list yet.
    pub fn list_name_email_pairs(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT username, email FROM users ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn lookup_id_by_email(&self, email: &str) -> Result<UserId> {
        self.get_user_by_email(email)?
            .map(|user| user.id)
            .ok_or_else(|| DbError::NotFound(format!("no user with email {}", email)))
    }

    pub fn lookup_id_by_username(&self, username: &str) -> Result<UserId> {
        self.get_user_by_username(username)?
            .map(|user| user.id)
            .ok_or_else(|| DbError::NotFound(format!("no user named {}", username)))
    }

    // -- Messages --

    /// Store a message and its conversation edge in one transaction.
    pub fn create_message(
        &self,
        sender: UserId,
        recipient: UserId,
        content: &str,
        time_sent: DateTime<Utc>,
    ) -> Result<MessageRow> {
        let row = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let recipient_exists = tx
                .query_row("SELECT 1 FROM users WHERE id = ?1", [recipient.get()], |_| Ok(()))
                .optional()?
                .is_some();
            if !recipient_exists {
                return Err(DbError::NotFound(format!("recipient {} does not exist", recipient)));
            }

            tx.execute(
                "INSERT INTO messages (content, time_sent) VALUES (?1, ?2)",
                rusqlite::params![content, time_sent.timestamp_millis()],
            )?;
            let message_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO conversations (sender_id, recipient_id, message_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![sender.get(), recipient.get(), message_id],
            )?;
            tx.commit()?;

            Ok(MessageRow {
                id: message_id,
                content: content.to_string(),
                time_sent: DateTime::from_timestamp_millis(time_sent.timestamp_millis())
                    .unwrap_or(time_sent),
            })
        })?;
        info!("Message {} sent from {} to {}", row.id, sender, recipient);
        Ok(row)
    }

    /// Every message between `reader` and `friend`, both directions, oldest
    /// first. A self-conversation lists each message once.
    pub fn get_one_conversation(&self, reader: UserId, friend: UserId) -> Result<Vec<ConversationMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT s.username, r.username, m.content, m.time_sent
                 FROM conversations c
                 JOIN users s ON s.id = c.sender_id
                 JOIN users r ON r.id = c.recipient_id
                 JOIN messages m ON m.id = c.message_id
                 WHERE (c.sender_id = ?1 AND c.recipient_id = ?2)
                    OR (c.sender_id = ?2 AND c.recipient_id = ?1)
                 ORDER BY m.time_sent, m.id",
            )?;
            let rows = stmt
                .query_map([reader.get(), friend.get()], conversation_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Latest message from every sender other than `reader`, oldest first,
    /// with content shortened for display.
    pub fn get_conversation_previews(&self, reader: UserId) -> Result<Vec<ConversationMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT s.username, r.username, latest.content, latest.time_sent
                 FROM (
                     SELECT c.sender_id, c.recipient_id, m.id AS message_id, m.content, m.time_sent,
                            ROW_NUMBER() OVER (
                                PARTITION BY c.sender_id
                                ORDER BY m.time_sent DESC, m.id ASC
                            ) AS rn
                     FROM conversations c
                     JOIN messages m ON m.id = c.message_id
                     WHERE c.sender_id != ?1
                 ) latest
                 JOIN users s ON s.id = latest.sender_id
                 JOIN users r ON r.id = latest.recipient_id
                 WHERE latest.rn = 1
                 ORDER BY latest.time_sent, latest.message_id",
            )?;
            let rows = stmt
                .query_map([reader.get()], conversation_message)?
                .map(|row| {
                    row.map(|mut msg| {
                        msg.content = truncate_preview(&msg.content);
                        msg
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, column: &str, value: P) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, hashed_password FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare_cached(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: user_id_column(0, row.get(0)?)?,
                username: row.get(1)?,
                email: row.get(2)?,
                hashed_password: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn conversation_message(row: &Row<'_>) -> rusqlite::Result<ConversationMessage> {
    Ok(ConversationMessage {
        sender: row.get(0)?,
        recipient: row.get(1)?,
        content: row.get(2)?,
        time_sent: timestamp_column(3, row.get(3)?)?,
    })
}

/// Content longer than 19 characters keeps its first 20 and gains "...".
pub fn truncate_preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS - 1 {
        let mut short: String = content.chars().take(PREVIEW_CHARS).collect();
        short.push_str("...");
        short
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::open_temp;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn two_users(db: &Database) -> (UserId, UserId) {
        let mia = db.create_user("mia", "mia@example.com", "hash").unwrap();
        let dash = db.create_user("dash", "dash@example.com", "hash").unwrap();
        (mia, dash)
    }

    #[test]
    fn create_and_fetch_user() {
        let (_dir, db) = open_temp();
        let (mia, _) = two_users(&db);

        let row = db.get_user_by_username("mia").unwrap().unwrap();
        assert_eq!(row.id, mia);
        assert_eq!(row.email, "mia@example.com");
        assert_eq!(db.get_user_by_email("mia@example.com").unwrap().unwrap().id, mia);
        assert_eq!(db.get_user_by_id(mia).unwrap().unwrap().username, "mia");
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_a_conflict() {
        let (_dir, db) = open_temp();
        two_users(&db);
        let err = db.create_user("mia", "other@example.com", "hash").unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)), "{err:?}");
        let err = db.create_user("other", "dash@example.com", "hash").unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)), "{err:?}");
    }

    #[test]
    fn lookups() {
        let (_dir, db) = open_temp();
        let (mia, dash) = two_users(&db);
        assert_eq!(db.lookup_id_by_username("dash").unwrap(), dash);
        assert_eq!(db.lookup_id_by_email("mia@example.com").unwrap(), mia);
        assert!(matches!(db.lookup_id_by_username("ghost"), Err(DbError::NotFound(_))));
        assert_eq!(
            db.list_name_email_pairs().unwrap(),
            vec![
                ("mia".to_string(), "mia@example.com".to_string()),
                ("dash".to_string(), "dash@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn message_to_missing_recipient_writes_nothing() {
        let (_dir, db) = open_temp();
        let (mia, _) = two_users(&db);
        let ghost = UserId::new(404).unwrap();

        let err = db.create_message(mia, ghost, "hello?", at(10)).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)), "{err:?}");

        let messages: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(messages, 0);
    }

    #[test]
    fn one_conversation_in_both_directions() {
        let (_dir, db) = open_temp();
        let (mia, dash) = two_users(&db);
        let carol = db.create_user("carol", "carol@example.com", "hash").unwrap();

        db.create_message(dash, mia, "Oh hello there", at(20)).unwrap();
        db.create_message(mia, dash, "Hi!", at(10)).unwrap();
        db.create_message(carol, mia, "unrelated", at(15)).unwrap();

        let convo = db.get_one_conversation(mia, dash).unwrap();
        let contents: Vec<_> = convo.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["Hi!", "Oh hello there"]);
        assert_eq!(convo[0].sender, "mia");
        assert_eq!(convo[0].recipient, "dash");

        // same history from the other side
        assert_eq!(db.get_one_conversation(dash, mia).unwrap(), convo);
    }

    #[test]
    fn self_conversation_lists_each_message_once() {
        let (_dir, db) = open_temp();
        let (mia, _) = two_users(&db);
        db.create_message(mia, mia, "reminder", at(5)).unwrap();

        let convo = db.get_one_conversation(mia, mia).unwrap();
        assert_eq!(convo.len(), 1);
        assert_eq!(convo[0].recipient, "mia");
    }

    #[test]
    fn previews_pick_latest_and_truncate() {
        let (_dir, db) = open_temp();
        let (mia, dash) = two_users(&db);
        let carol = db.create_user("carol", "carol@example.com", "hash").unwrap();

        db.create_message(dash, mia, "first", at(10)).unwrap();
        db.create_message(dash, mia, "a considerably longer message body", at(30)).unwrap();
        db.create_message(carol, mia, "short", at(20)).unwrap();
        db.create_message(mia, dash, "mine are skipped", at(40)).unwrap();

        let previews = db.get_conversation_previews(mia).unwrap();
        assert_eq!(previews.len(), 2);
        assert_eq!(previews[0].sender, "carol");
        assert_eq!(previews[0].content, "short");
        assert_eq!(previews[1].sender, "dash");
        assert_eq!(previews[1].content, "a considerably longe...");
        assert_eq!(previews[1].time_sent, at(30));
    }

    #[test]
    fn truncation_boundaries() {
        assert_eq!(truncate_preview("nineteen characters"), "nineteen characters");
        assert_eq!(truncate_preview("exactly twenty chars"), "exactly twenty chars...");
        assert_eq!(truncate_preview(""), "");
        assert_eq!(truncate_preview("ééééééééééééééééééééééé"), "éééééééééééééééééééé...");
    }
}
