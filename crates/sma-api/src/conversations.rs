use axum::{
    Json,
    extract::{Query, State},
};

use sma_types::api::{LatestMessagesQuery, SendersQuery};
use sma_types::models::{ConversationMessage, LatestMessage, UserId};

use crate::auth::{AppState, with_db};
use crate::error::ApiResult;

/// GET /conversations
pub async fn list_conversations(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ConversationMessage>>> {
    let rows = with_db(&state, |db| db.list_conversation_view()).await?;
    Ok(Json(rows))
}

/// GET /senders?recipient={id}
pub async fn list_senders(
    State(state): State<AppState>,
    Query(query): Query<SendersQuery>,
) -> ApiResult<Json<Vec<UserId>>> {
    let recipient: UserId = query.recipient.parse()?;
    let senders = with_db(&state, move |db| db.list_message_senders(recipient)).await?;
    Ok(Json(senders))
}

/// GET /latest-messages?exclude_sender={id}
pub async fn latest_messages(
    State(state): State<AppState>,
    Query(query): Query<LatestMessagesQuery>,
) -> ApiResult<Json<Vec<LatestMessage>>> {
    let excluded: UserId = query.exclude_sender.parse()?;
    let latest = with_db(&state, move |db| db.most_recent_message_per_sender(excluded)).await?;
    Ok(Json(latest))
}
