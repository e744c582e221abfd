//! Registration and login handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use unistream_core::{Role, User};

use crate::auth::{hash_password, issue_token, new_verification_token, verify_password};
use crate::error::ApiError;
use crate::handlers::users::UserResponse;
use crate::mailer::deliver_verification;
use crate::state::AppState;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Register request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Plain-text password.
    pub password: String,
    /// Fan (default) or streamer.
    #[serde(default)]
    pub role: Role,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

/// Account confirmation request.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Token from the confirmation email.
    pub token: String,
}

/// Registration and confirmation response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// What the client should do next.
    pub message: String,
    /// The account.
    pub user: UserResponse,
}

/// Session response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Bearer token.
    pub token: String,
    /// The account.
    pub user: UserResponse,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create an unverified account and email its confirmation token.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let email = normalize_email(&body.email);
    let name = body.name.trim();

    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(ApiError::BadRequest("a valid email is required".into()));
    }
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    if body.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }

    let password_hash = hash_password(&body.password).await?;
    let token = new_verification_token();
    let user = User::new(email, name, password_hash, body.role).registered(token.clone());
    state.store.create_user(&user).await.map_err(|e| match e {
        unistream_store::StoreError::Conflict(_) => {
            ApiError::Conflict("email is already registered".into())
        }
        other => other.into(),
    })?;

    deliver_verification(state.mailer.as_ref(), &user.email, &user.name, &token);

    tracing::info!(user_id = %user.id, role = %user.role, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "Account created. Check your email to verify it.".into(),
            user: UserResponse::from(&user),
        }),
    ))
}

/// Confirm an account with the token from its registration email.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let token = body.token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest("token is required".into()));
    }

    let user = state
        .store
        .verify_user(token)
        .await?
        .ok_or_else(|| ApiError::BadRequest("invalid or expired verification token".into()))?;

    tracing::info!(user_id = %user.id, "Account verified");

    Ok(Json(AccountResponse {
        message: "Account verified.".into(),
        user: UserResponse::from(&user),
    }))
}

/// Exchange email and password for a session token.
///
/// Unverified accounts are refused with 403 once the password matches.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = normalize_email(&body.email);
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&body.password, &user.password_hash).await {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized);
    }
    if !user.is_verified {
        tracing::debug!(user_id = %user.id, "Login rejected: account not verified");
        return Err(ApiError::Forbidden(
            "verify your email before logging in".into(),
        ));
    }

    let token = issue_token(
        &user.id,
        &state.config.jwt_secret,
        state.config.token_ttl_seconds,
    )?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(&user),
    }))
}
