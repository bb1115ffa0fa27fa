use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::CurrentUser,
    authz::{self, Capability},
    error::{AppError, Result},
    models::{CreatePostRequest, ModerationAction, ModerationLog, Post, UpdatePostRequest},
    AppState,
};

use super::Pagination;

const MAX_PAGE: usize = 200;

/// Posts within a thread, strictly in chronological reading order
pub async fn list_posts(
    State(state): State<AppState>,
    Path((board_id, thread_id)): Path<(String, String)>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Post>>> {
    let (skip, limit) = page.clamped(MAX_PAGE);
    let db = state.boards.resolve(&board_id);
    Ok(Json(db.list_posts(&thread_id, skip, limit).await?))
}

/// Create a post. On success the parent thread's post_count is incremented
/// and its updated_at bumped in one atomic storage update. This is the only
/// path that creates counted posts.
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board_id, thread_id)): Path<(String, String)>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    req.validate().map_err(|msg| AppError::Validation(msg.to_string()))?;
    authz::require(&user, Capability::CreatePost, None)?;

    let db = state.boards.resolve(&board_id);
    let thread = db.get_thread(&thread_id).await?;
    if thread.is_locked && !user.is_admin() {
        return Err(AppError::Forbidden("Thread is locked".to_string()));
    }

    let post = Post::new(thread_id.clone(), user.id.clone(), req.content, req.ascii_art);
    db.create_post(&post).await?;
    db.bump_post_count(&thread_id).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board_id, post_id)): Path<(String, String)>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<Post>> {
    req.validate().map_err(|msg| AppError::Validation(msg.to_string()))?;

    let db = state.boards.resolve(&board_id);
    let post = db.get_post(&post_id).await?;

    authz::require(&user, Capability::EditPost, Some(&post.author_id))?;
    db.update_post_content(&post_id, &req.content).await?;

    Ok(Json(db.get_post(&post_id).await?))
}

/// Delete a post. Deletion is not a counted path: the parent thread's
/// post_count is not decremented (it tracks the increment path only).
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((board_id, post_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let db = state.boards.resolve(&board_id);
    let post = db.get_post(&post_id).await?;

    authz::require(&user, Capability::DeletePost, Some(&post.author_id))?;
    db.delete_post(&post_id).await?;

    // Moderator removals of someone else's post are audited
    if user.is_admin() && user.id != post.author_id {
        let log = ModerationLog::new(
            post.author_id.clone(),
            ModerationAction::Delete,
            "post removed by moderator".to_string(),
            user.id.clone(),
            Some(post.id.clone()),
        );
        state.boards.default_partition().append_moderation_log(&log).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
