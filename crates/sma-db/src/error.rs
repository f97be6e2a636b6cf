use rusqlite::ErrorCode;
use rusqlite::ffi;
use sma_types::models::ParseUserIdError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

/// Failures surfaced by the store. Nothing here is retried locally; callers
/// branch on the variant.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, msg) = &e {
            let detail = msg.clone().unwrap_or_else(|| err.to_string());
            if err.code == ErrorCode::ConstraintViolation {
                match err.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        return DbError::Conflict(detail);
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        return DbError::NotFound(detail);
                    }
                    _ => {}
                }
            }
        }
        DbError::StoreUnavailable(e.to_string())
    }
}

impl From<ParseUserIdError> for DbError {
    fn from(e: ParseUserIdError) -> Self {
        DbError::MalformedInput(e.to_string())
    }
}
