//! Read-only queries over the conversation edges.
//!
//! None of these hold state between calls. A user id that does not exist
//! produces an empty result, never an error; callers that need to tell
//! "unknown user" apart from "no messages" must check existence themselves.

use rusqlite::Connection;
use sma_types::models::{ConversationMessage, LatestMessage, UserId};
use tracing::debug;

use crate::models::{timestamp_column, user_id_column};
use crate::{Database, Result};

impl Database {
    /// Every conversation edge with sender, recipient and message resolved.
    /// Edges with a dangling reference are dropped (inner joins).
    pub fn list_conversation_view(&self) -> Result<Vec<ConversationMessage>> {
        self.with_conn(query_conversation_view)
    }

    /// Distinct ids of users who have sent `recipient` at least one message,
    /// excluding `recipient` itself.
    pub fn list_message_senders(&self, recipient: UserId) -> Result<Vec<UserId>> {
        self.with_conn(|conn| query_message_senders(conn, recipient))
    }

    /// For each sender other than `excluded`, the content and time of their
    /// latest message to anyone. Equal timestamps resolve to the lowest
    /// message id.
    pub fn most_recent_message_per_sender(&self, excluded: UserId) -> Result<Vec<LatestMessage>> {
        self.with_conn(|conn| query_latest_per_sender(conn, excluded))
    }
}

fn query_conversation_view(conn: &Connection) -> Result<Vec<ConversationMessage>> {
    let mut stmt = conn.prepare_cached(
        "SELECT s.username, r.username, m.content, m.time_sent
         FROM conversations c
         JOIN users s ON s.id = c.sender_id
         JOIN users r ON r.id = c.recipient_id
         JOIN messages m ON m.id = c.message_id
         ORDER BY c.id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ConversationMessage {
                sender: row.get(0)?,
                recipient: row.get(1)?,
                content: row.get(2)?,
                time_sent: timestamp_column(3, row.get(3)?)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    debug!("conversation view: {} rows", rows.len());
    Ok(rows)
}

fn query_message_senders(conn: &Connection, recipient: UserId) -> Result<Vec<UserId>> {
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT c.sender_id
         FROM conversations c
         JOIN users u ON u.id = c.recipient_id
         WHERE c.recipient_id = ?1
           AND u.id != c.sender_id
         ORDER BY c.sender_id",
    )?;

    let rows = stmt
        .query_map([recipient.get()], |row| user_id_column(0, row.get(0)?))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    debug!("senders to {}: {}", recipient, rows.len());
    Ok(rows)
}

fn query_latest_per_sender(conn: &Connection, excluded: UserId) -> Result<Vec<LatestMessage>> {
    let mut stmt = conn.prepare_cached(
        "SELECT sender_id, content, time_sent
         FROM (
             SELECT c.sender_id, m.content, m.time_sent,
                    ROW_NUMBER() OVER (
                        PARTITION BY c.sender_id
                        ORDER BY m.time_sent DESC, m.id ASC
                    ) AS rn
             FROM conversations c
             JOIN messages m ON m.id = c.message_id
             WHERE c.sender_id != ?1
         )
         WHERE rn = 1
         ORDER BY time_sent, sender_id",
    )?;

    let rows = stmt
        .query_map([excluded.get()], |row| {
            Ok(LatestMessage {
                sender_id: user_id_column(0, row.get(0)?)?,
                content: row.get(1)?,
                time_sent: timestamp_column(2, row.get(2)?)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    debug!("latest messages excluding {}: {}", excluded, rows.len());
    Ok(rows)
}
