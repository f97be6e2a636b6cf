use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use sma_db::DbError;
use sma_types::api::ErrorBody;
use sma_types::models::ParseUserIdError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Incorrect username or password.")]
    BadCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    AlreadyRegistered(String),

    #[error("Service unavailable.")]
    Unavailable(String),

    #[error("Internal server error.")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::AlreadyRegistered(_) => StatusCode::BAD_REQUEST,
            Self::BadCredentials => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(detail) => Self::NotFound(detail),
            DbError::MalformedInput(detail) => Self::BadRequest(detail),
            DbError::Conflict(detail) => Self::AlreadyRegistered(detail),
            DbError::StoreUnavailable(detail) => Self::Unavailable(detail),
        }
    }
}

impl From<ParseUserIdError> for ApiError {
    fn from(e: ParseUserIdError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Unavailable(detail) => error!("Store unavailable: {}", detail),
            Self::Internal => error!("Internal error"),
            Self::BadRequest(detail) => warn!("Rejected request: {}", detail),
            _ => {}
        }

        let status = self.status();
        let mut response = (status, Json(ErrorBody { detail: self.to_string() })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (DbError::StoreUnavailable("database is locked".into()), StatusCode::SERVICE_UNAVAILABLE),
            (DbError::NotFound("recipient 9".into()), StatusCode::NOT_FOUND),
            (DbError::MalformedInput("invalid user id".into()), StatusCode::BAD_REQUEST),
            (DbError::Conflict("UNIQUE constraint failed".into()), StatusCode::BAD_REQUEST),
        ];
        for (db_err, status) in cases {
            let response = ApiError::from(db_err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let response = ApiError::BadCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
