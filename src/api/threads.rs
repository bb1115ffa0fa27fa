use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::CurrentUser,
    authz::{self, Capability},
    error::{AppError, Result},
    models::{CreateThreadRequest, ModerationAction, ModerationLog, Thread, UpdateThreadRequest},
    AppState,
};

use super::Pagination;

const MAX_PAGE: usize = 100;

/// List a board's threads: pinned first, then most recently updated
pub async fn list_threads(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Thread>>> {
    let (skip, limit) = page.clamped(MAX_PAGE);
    let db = state.boards.resolve(&board_id);
    Ok(Json(db.list_threads(&board_id, skip, limit).await?))
}

pub async fn create_thread(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(board_id): Path<String>,
    Json(req): Json<CreateThreadRequest>,
) -> Result<(StatusCode, Json<Thread>)> {
    req.validate().map_err(|msg| AppError::Validation(msg.to_string()))?;
    authz::require(&user, Capability::CreateThread, None)?;

    let thread = Thread::new(board_id.clone(), user.id.clone(), req.title);
    state.boards.resolve(&board_id).create_thread(&thread).await?;

    tracing::info!(thread_id = %thread.id, board_id = %board_id, "created thread");
    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path((board_id, thread_id)): Path<(String, String)>,
) -> Result<Json<Thread>> {
    let db = state.boards.resolve(&board_id);
    Ok(Json(db.get_thread(&thread_id).await?))
}

/// Partial update. Title edits need ownership (or admin); the lock and pin
/// flags are admin capabilities checked per field, so a request is rejected
/// before any of its fields are applied.
pub async fn update_thread(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board_id, thread_id)): Path<(String, String)>,
    Json(req): Json<UpdateThreadRequest>,
) -> Result<Json<Thread>> {
    req.validate().map_err(|msg| AppError::Validation(msg.to_string()))?;

    let db = state.boards.resolve(&board_id);
    let thread = db.get_thread(&thread_id).await?;

    if req.title.is_some() {
        authz::require(&user, Capability::EditThread, Some(&thread.author_id))?;
    }
    match req.is_locked {
        Some(true) => authz::require(&user, Capability::LockThread, None)?,
        Some(false) => authz::require(&user, Capability::UnlockThread, None)?,
        None => {}
    }
    match req.is_pinned {
        Some(true) => authz::require(&user, Capability::PinThread, None)?,
        Some(false) => authz::require(&user, Capability::UnpinThread, None)?,
        None => {}
    }

    if let Some(title) = &req.title {
        db.set_thread_title(&thread_id, title).await?;
    }
    if let Some(locked) = req.is_locked {
        db.set_thread_locked(&thread_id, locked).await?;
    }
    if let Some(pinned) = req.is_pinned {
        db.set_thread_pinned(&thread_id, pinned).await?;
    }

    Ok(Json(db.get_thread(&thread_id).await?))
}

pub async fn delete_thread(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board_id, thread_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let db = state.boards.resolve(&board_id);
    let thread = db.get_thread(&thread_id).await?;

    authz::require(&user, Capability::DeleteThread, Some(&thread.author_id))?;
    db.delete_thread(&thread_id).await?;

    // Moderator removals of other people's threads land in the audit trail
    if user.is_admin() && user.id != thread.author_id {
        let log = ModerationLog::new(
            thread.author_id.clone(),
            ModerationAction::Delete,
            format!("thread '{}' removed by moderator", thread.title),
            user.id.clone(),
            None,
        );
        state.boards.default_partition().append_moderation_log(&log).await?;
    }

    tracing::info!(thread_id = %thread_id, board_id = %board_id, "deleted thread");
    Ok(StatusCode::NO_CONTENT)
}
