use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a user account. Always a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid user id: {0:?}")]
pub struct ParseUserIdError(pub String);

impl UserId {
    pub fn new(raw: i64) -> Result<Self, ParseUserIdError> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(ParseUserIdError(raw.to_string()))
        }
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl FromStr for UserId {
    type Err = ParseUserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s.trim().parse().map_err(|_| ParseUserIdError(s.to_string()))?;
        Self::new(raw).map_err(|_| ParseUserIdError(s.to_string()))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation edge with both users and the message resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub sender: String,
    pub recipient: String,
    pub content: String,
    pub time_sent: DateTime<Utc>,
}

/// Latest message of one sender, to anyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestMessage {
    pub sender_id: UserId,
    pub content: String,
    pub time_sent: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids() {
        assert_eq!("42".parse::<UserId>().unwrap().get(), 42);
        assert_eq!(" 7 ".parse::<UserId>().unwrap().get(), 7);
    }

    #[test]
    fn rejects_non_identifiers() {
        for bad in ["", "abc", "0", "-3", "1.5", "99999999999999999999"] {
            assert!(bad.parse::<UserId>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn serializes_as_bare_number() {
        let id = UserId::new(5).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "5");
        let back: UserId = serde_json::from_str("5").unwrap();
        assert_eq!(back, id);
    }
}
