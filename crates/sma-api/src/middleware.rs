use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

use sma_types::api::Claims;

use crate::auth::{AppState, with_db};
use crate::error::ApiError;

/// Extract and validate the bearer JWT, then make sure the account it names
/// still exists. Inserts the `Claims` for downstream handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::BadCredentials)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        ApiError::BadCredentials
    })?;

    let user_id = token_data.claims.sub;
    let exists = with_db(&state, move |db| Ok(db.get_user_by_id(user_id)?.is_some())).await?;
    if !exists {
        warn!("Token for deleted user {}", user_id);
        return Err(ApiError::BadCredentials);
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
