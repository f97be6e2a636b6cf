use axum::{Json, extract::State};

use sma_types::api::{UserIdResponse, UserLookup, UserSummary};

use crate::auth::{AppState, with_db};
use crate::error::{ApiError, ApiResult};

/// GET /friends: every account's username and email. There is no friend
/// list yet, so this is the whole directory.
pub async fn get_friends(State(state): State<AppState>) -> ApiResult<Json<Vec<UserSummary>>> {
    let pairs = with_db(&state, |db| db.list_name_email_pairs()).await?;
    Ok(Json(
        pairs
            .into_iter()
            .map(|(username, email)| UserSummary { username, email })
            .collect(),
    ))
}

/// POST /lookup: resolve an email or username to a user id so a client can
/// address messages.
pub async fn lookup_user(
    State(state): State<AppState>,
    Json(req): Json<UserLookup>,
) -> ApiResult<Json<UserIdResponse>> {
    let email = req.email.filter(|e| !e.is_empty());
    let username = req.username.filter(|u| !u.is_empty());

    let result = match (email, username) {
        (Some(email), _) => {
            with_db(&state, move |db| db.lookup_id_by_email(&email))
                .await
                .map_err(|e| not_found_as(e, "The provided email was not found."))
        }
        (None, Some(username)) => {
            with_db(&state, move |db| db.lookup_id_by_username(&username))
                .await
                .map_err(|e| not_found_as(e, "The provided username was not found."))
        }
        (None, None) => return Err(ApiError::Unprocessable("Invalid user query.".into())),
    };

    Ok(Json(UserIdResponse { id: result? }))
}

fn not_found_as(e: ApiError, detail: &str) -> ApiError {
    match e {
        ApiError::NotFound(_) => ApiError::Unprocessable(detail.to_string()),
        other => other,
    }
}

