use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::CurrentAdmin,
    authz::{self, Capability},
    error::{AppError, Result},
    models::{ModerationAction, ModerationLog, UserResponse},
    AppState,
};

use super::Pagination;

const MAX_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct GhostModeRequest {
    pub enabled: bool,
}

/// Toggle the acting admin's own presence flag. Idempotent either way.
pub async fn set_ghost_mode(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Json(req): Json<GhostModeRequest>,
) -> Result<Json<Value>> {
    authz::require(&admin, Capability::GhostMode, None)?;

    if req.enabled {
        state.ghosts.enable(&admin.id);
    } else {
        state.ghosts.disable(&admin.id);
    }

    Ok(Json(json!({
        "user_id": admin.id,
        "ghost_mode": req.enabled,
    })))
}

pub async fn ghost_mode_status(
    State(state): State<AppState>,
    admin: CurrentAdmin,
) -> Json<Value> {
    Json(json!({
        "user_id": admin.id,
        "ghost_mode": state.ghosts.is_ghost(&admin.id),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LockUserRequest {
    pub user_id: String,
    /// Lock duration; falls back to the configured default (24h)
    pub lock_duration_hours: Option<i64>,
    pub reason: Option<String>,
}

/// Lock a user account for a duration. Self-lock is rejected before any
/// state mutation.
pub async fn lock_user(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Json(req): Json<LockUserRequest>,
) -> Result<Json<Value>> {
    authz::require(&admin, Capability::ManageUsers, None)?;

    if req.user_id == admin.id {
        return Err(AppError::Forbidden("Cannot lock your own account".to_string()));
    }

    let db = state.boards.default_partition();
    let user = db.get_user(&req.user_id).await?;

    let hours = req
        .lock_duration_hours
        .unwrap_or(state.config.moderation.default_lock_hours);
    if hours <= 0 {
        return Err(AppError::Validation("lock duration must be positive".to_string()));
    }
    let expires_at = Utc::now() + Duration::hours(hours);

    db.lock_user(&user.id, expires_at).await?;

    let log = ModerationLog::new(
        user.id.clone(),
        ModerationAction::Lock,
        req.reason.unwrap_or_else(|| format!("locked for {} hours", hours)),
        admin.id.clone(),
        None,
    );
    db.append_moderation_log(&log).await?;

    tracing::info!(user_id = %user.id, hours, "locked user account");
    Ok(Json(json!({
        "message": format!("User {} locked for {} hours", user.username, hours),
        "user": UserResponse::from(&db.get_user(&user.id).await?),
        "lock_expires_at": expires_at,
    })))
}

pub async fn unlock_user(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    authz::require(&admin, Capability::ManageUsers, None)?;

    let db = state.boards.default_partition();
    let user = db.get_user(&user_id).await?;
    db.unlock_user(&user.id).await?;

    let log = ModerationLog::new(
        user.id.clone(),
        ModerationAction::Unlock,
        "unlocked by moderator".to_string(),
        admin.id.clone(),
        None,
    );
    db.append_moderation_log(&log).await?;

    Ok(Json(json!({
        "message": format!("User {} unlocked", user.username),
        "user": UserResponse::from(&db.get_user(&user.id).await?),
    })))
}

#[derive(Debug, Deserialize)]
pub struct WarnUserRequest {
    pub reason: String,
    pub post_id: Option<String>,
}

/// Record a spam warning: bumps the monotonic counter and appends the audit
/// entry. Threshold policy (when warnings become a lock) lives outside the
/// core; this only exposes the primitive.
pub async fn warn_user(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(user_id): Path<String>,
    Json(req): Json<WarnUserRequest>,
) -> Result<Json<Value>> {
    authz::require(&admin, Capability::ManageUsers, None)?;

    let db = state.boards.default_partition();
    let warnings = db.increment_spam_warnings(&user_id).await?;

    let log = ModerationLog::new(
        user_id.clone(),
        ModerationAction::Warning,
        req.reason,
        admin.id.clone(),
        req.post_id,
    );
    db.append_moderation_log(&log).await?;

    Ok(Json(json!({
        "user_id": user_id,
        "spam_warnings": warnings,
    })))
}

/// Promote an account to admin
pub async fn promote_user(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>> {
    authz::require(&admin, Capability::ManageUsers, None)?;

    let user = state.boards.default_partition().promote_to_admin(&user_id).await?;
    tracing::info!(user_id = %user.id, promoted_by = %admin.id, "promoted user to admin");
    Ok(Json(UserResponse::from(&user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<UserResponse>>> {
    authz::require(&admin, Capability::ManageUsers, None)?;

    let (skip, limit) = page.clamped(MAX_PAGE);
    let users = state.boards.default_partition().list_users(skip, limit).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>> {
    authz::require(&admin, Capability::ManageUsers, None)?;

    let user = state.boards.default_partition().get_user(&user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}

pub async fn list_moderation_logs(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<crate::models::ModerationLog>>> {
    authz::require(&admin, Capability::ViewModerationLogs, None)?;

    let (skip, limit) = page.clamped(MAX_PAGE);
    let logs = state
        .boards
        .default_partition()
        .recent_moderation_logs(skip, limit)
        .await?;
    Ok(Json(logs))
}

pub async fn user_moderation_logs(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(user_id): Path<String>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<crate::models::ModerationLog>>> {
    authz::require(&admin, Capability::ViewModerationLogs, None)?;

    let (skip, limit) = page.clamped(MAX_PAGE);
    let logs = state
        .boards
        .default_partition()
        .moderation_logs_for_user(&user_id, skip, limit)
        .await?;
    Ok(Json(logs))
}

/// Capability introspection for the acting admin
pub async fn permissions(State(state): State<AppState>, admin: CurrentAdmin) -> Json<Value> {
    Json(json!({
        "user_id": admin.id,
        "role": admin.role,
        "permissions": {
            "can_lock_threads": authz::allows(&admin, Capability::LockThread, None),
            "can_pin_threads": authz::allows(&admin, Capability::PinThread, None),
            "can_manage_users": authz::allows(&admin, Capability::ManageUsers, None),
            "can_view_mod_logs": authz::allows(&admin, Capability::ViewModerationLogs, None),
            "can_access_admin_panel": authz::allows(&admin, Capability::AccessAdminPanel, None),
            "ghost_mode_available": authz::allows(&admin, Capability::GhostMode, None),
            "is_ghost_mode": state.ghosts.is_ghost(&admin.id),
        }
    }))
}
