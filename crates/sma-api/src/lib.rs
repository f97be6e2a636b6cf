pub mod auth;
pub mod conversations;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod users;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AppState;
use crate::middleware::require_auth;

/// Full HTTP surface: public auth routes plus everything behind the bearer
/// token check.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/friends", get(users::get_friends))
        .route("/lookup", post(users::lookup_user))
        .route("/lookup/", post(users::lookup_user))
        .route("/messages", get(messages::get_previews))
        .route("/messages/", get(messages::get_previews))
        .route(
            "/messages/{friend_id}",
            get(messages::get_conversation).post(messages::send_message),
        )
        .route("/conversations", get(conversations::list_conversations))
        .route("/senders", get(conversations::list_senders))
        .route("/latest-messages", get(conversations::latest_messages))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
