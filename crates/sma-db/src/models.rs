//! Row types as read from SQLite, kept separate from the wire types in
//! `sma-types`.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use sma_types::models::UserId;

#[derive(Debug)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: i64,
    pub content: String,
    pub time_sent: DateTime<Utc>,
}

/// Convert a stored id column into a `UserId`.
pub(crate) fn user_id_column(idx: usize, raw: i64) -> rusqlite::Result<UserId> {
    UserId::new(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

/// `time_sent` is stored as milliseconds since the Unix epoch.
pub(crate) fn timestamp_column(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {}", millis).into(),
        )
    })
}
