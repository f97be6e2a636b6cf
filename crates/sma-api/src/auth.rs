use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    http::header,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{error, info, warn};

use sma_db::Database;
use sma_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use sma_types::models::UserId;

use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

/// Run a store call on the blocking pool.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> sma_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    // Validate input
    let name_chars = req.username.chars().count();
    if !(3..=64).contains(&name_chars) {
        return Err(ApiError::BadRequest("Username must be 3 to 64 characters.".into()));
    }
    if !req.email.contains('@') || req.email.chars().count() > 128 {
        return Err(ApiError::BadRequest("Invalid email address.".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("Password must be at least 8 characters.".into()));
    }

    let (username, email) = (req.username.clone(), req.email.clone());
    let (name_taken, email_taken) = with_db(&state, move |db| {
        Ok((
            db.get_user_by_username(&username)?.is_some(),
            db.get_user_by_email(&email)?.is_some(),
        ))
    })
    .await?;
    if name_taken {
        return Err(ApiError::AlreadyRegistered("Username already registered".into()));
    }
    if email_taken {
        return Err(ApiError::AlreadyRegistered("Email already registered".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal
        })?
        .to_string();

    let (username, email) = (req.username.clone(), req.email);
    // A concurrent registration can still win the race past the checks above.
    let user_id = with_db(&state, move |db| db.create_user(&username, &email, &password_hash))
        .await
        .map_err(registration_conflict)?;

    let access_token = create_token(&state, user_id, &req.username).map_err(|e| {
        error!("Token creation failed: {}", e);
        ApiError::Internal
    })?;

    info!("Registered {} as user {}", req.username, user_id);
    Ok(Json(RegisterResponse {
        user_id,
        access_token,
        token_type: "bearer".into(),
    }))
}

/// Replace the raw SQLite constraint text with the message clients expect.
fn registration_conflict(e: ApiError) -> ApiError {
    match e {
        ApiError::AlreadyRegistered(detail) if detail.contains("users.email") => {
            ApiError::AlreadyRegistered("Email already registered".into())
        }
        ApiError::AlreadyRegistered(_) => ApiError::AlreadyRegistered("Username already registered".into()),
        other => other,
    }
}

/// Login credentials from either a JSON body or an
/// `application/x-www-form-urlencoded` OAuth2 password form.
pub struct Credentials(pub LoginRequest);

impl<S> FromRequest<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

        let login = if is_form {
            Form::<LoginRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?
                .0
        } else {
            Json::<LoginRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?
                .0
        };
        Ok(Self(login))
    }
}

pub async fn login(
    State(state): State<AppState>,
    Credentials(req): Credentials,
) -> ApiResult<Json<LoginResponse>> {
    let username = req.username.clone();
    let user = with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::BadCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.hashed_password).map_err(|e| {
        error!("Stored hash for {} is unreadable: {}", user.username, e);
        ApiError::Internal
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!("Failed login for {}", user.username);
            ApiError::BadCredentials
        })?;

    let access_token = create_token(&state, user.id, &user.username).map_err(|e| {
        error!("Token creation failed: {}", e);
        ApiError::Internal
    })?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        access_token,
        token_type: "bearer".into(),
    }))
}

fn create_token(state: &AppStateInner, user_id: UserId, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_unique_violations_become_friendly_messages() {
        let name = registration_conflict(ApiError::AlreadyRegistered(
            "UNIQUE constraint failed: users.username".into(),
        ));
        assert_eq!(name.to_string(), "Username already registered");

        let email = registration_conflict(ApiError::AlreadyRegistered(
            "UNIQUE constraint failed: users.email".into(),
        ));
        assert_eq!(email.to_string(), "Email already registered");

        let other = registration_conflict(ApiError::Unavailable("locked".into()));
        assert!(matches!(other, ApiError::Unavailable(_)));
    }
}
