use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::debug;

use sma_types::api::{Claims, SendMessageRequest};
use sma_types::models::{ConversationMessage, UserId};

use crate::auth::{AppState, with_db};
use crate::error::{ApiError, ApiResult};

/// Upper bound on stored message content.
const MAX_CONTENT_BYTES: usize = 4096;

/// GET /messages: latest message from everyone who has written to anyone,
/// excluding the caller's own, as truncated previews.
pub async fn get_previews(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<ConversationMessage>>> {
    let reader = claims.sub;
    let previews = with_db(&state, move |db| db.get_conversation_previews(reader)).await?;
    debug!("{} previews for {}", previews.len(), reader);
    Ok(Json(previews))
}

/// GET /messages/{friend_id}: full history between the caller and a friend.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(friend_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<ConversationMessage>>> {
    let friend: UserId = friend_id.parse()?;
    let reader = claims.sub;
    let history = with_db(&state, move |db| db.get_one_conversation(reader, friend)).await?;
    Ok(Json(history))
}

/// POST /messages/{friend_id}: store a message, then return the updated
/// history so the client can render it without a second call.
pub async fn send_message(
    State(state): State<AppState>,
    Path(friend_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<Vec<ConversationMessage>>> {
    let friend: UserId = friend_id.parse()?;
    if req.content.is_empty() {
        return Err(ApiError::BadRequest("Message content is empty.".into()));
    }
    if req.content.len() > MAX_CONTENT_BYTES {
        return Err(ApiError::BadRequest(format!(
            "Message content exceeds {} bytes.",
            MAX_CONTENT_BYTES
        )));
    }

    let sender = claims.sub;
    let now = chrono::Utc::now();
    let history = with_db(&state, move |db| {
        db.create_message(sender, friend, &req.content, now)?;
        db.get_one_conversation(sender, friend)
    })
    .await?;

    Ok(Json(history))
}
