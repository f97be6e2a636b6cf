use serde::{Deserialize, Serialize};

use crate::models::UserId;

// -- JWT Claims --

/// JWT claims issued at login/registration and checked by the auth
/// middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
    pub access_token: String,
    pub token_type: String,
}

/// Accepted as JSON or as an OAuth2 password form. Form clients also send
/// `grant_type`, `scope`, `client_id` and `client_secret`, which are ignored.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub username: String,
    pub access_token: String,
    pub token_type: String,
}

// -- Users --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub email: String,
}

/// Find a user id by email or username. Email wins when both are given.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserLookup {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserIdResponse {
    pub id: UserId,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

// -- Conversation queries --

/// Query string for `GET /senders`. Kept as a raw string so a non-numeric
/// id surfaces as a typed validation error instead of an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct SendersQuery {
    pub recipient: String,
}

#[derive(Debug, Deserialize)]
pub struct LatestMessagesQuery {
    pub exclude_sender: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
