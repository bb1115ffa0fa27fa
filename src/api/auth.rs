use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    auth::{self, CurrentUser},
    error::{AppError, Result},
    models::{LoginRequest, RegisterRequest, User, UserResponse},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub user: UserResponse,
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    req.validate().map_err(|msg| AppError::Validation(msg.to_string()))?;

    let digest = auth::hash_password(&req.password)?;
    let user = User::new(req.username, req.email, digest);

    // The unique indexes on email/username surface duplicates as Conflict
    state.boards.default_partition().create_user(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "registered user");
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Login with email + password, receiving an access/refresh token pair.
///
/// A lock still in force fails with the expiry attached; an expired lock is
/// healed here and the login proceeds normally.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPair>> {
    let db = state.boards.default_partition();

    let user = db
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid email or password".to_string()))?;

    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(AppError::Unauthenticated("Invalid email or password".to_string()));
    }

    let user = db.reconcile_lock(user).await?;
    if user.lock_in_force(Utc::now()) {
        return match user.lock_expires_at {
            Some(expires_at) => Err(AppError::AccountLocked(expires_at)),
            None => Err(AppError::Forbidden("Account is locked".to_string())),
        };
    }

    let access_token = state.tokens.issue_access_token(&user.id)?;
    let refresh_token = state.tokens.issue_refresh_token(&user.id)?;

    Ok(Json(TokenPair {
        access_token,
        refresh_token,
        token_type: "bearer",
        user: UserResponse::from(&user),
    }))
}

/// Exchange a refresh token for a fresh access token
pub async fn refresh(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Json<Value>> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthenticated("Missing refresh token".to_string()))?;

    let claims = state.tokens.decode(token)?;
    if !claims.is_refresh() {
        return Err(AppError::Unauthenticated("Not a refresh token".to_string()));
    }

    // The subject must still exist; its lock state is checked on use
    let user = state
        .boards
        .default_partition()
        .find_user_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Unknown user".to_string()))?;

    let access_token = state.tokens.issue_access_token(&user.id)?;
    Ok(Json(json!({
        "access_token": access_token,
        "token_type": "bearer"
    })))
}

/// Current authenticated user
pub async fn me(user: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user.0))
}

/// Stateless logout; the client discards its tokens
pub async fn logout() -> Json<Value> {
    Json(json!({ "message": "Logged out. Discard your tokens." }))
}
