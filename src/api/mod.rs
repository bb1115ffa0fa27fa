mod admin;
mod auth;
mod boards;
mod posts;
mod threads;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::AppState;

/// Build the API router
pub fn router() -> Router<AppState> {
    Router::new()
        // Auth routes
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        // Board routes (boards are fixed at provisioning, read-only)
        .route("/boards", get(boards::list_boards))
        .route("/boards/{board_id}", get(boards::get_board))
        // Thread routes
        .route("/boards/{board_id}/threads", get(threads::list_threads))
        .route("/boards/{board_id}/threads", post(threads::create_thread))
        .route("/boards/{board_id}/threads/{thread_id}", get(threads::get_thread))
        .route("/boards/{board_id}/threads/{thread_id}", patch(threads::update_thread))
        .route("/boards/{board_id}/threads/{thread_id}", delete(threads::delete_thread))
        // Post routes
        .route("/boards/{board_id}/threads/{thread_id}/posts", get(posts::list_posts))
        .route("/boards/{board_id}/threads/{thread_id}/posts", post(posts::create_post))
        .route("/boards/{board_id}/posts/{post_id}", patch(posts::update_post))
        .route("/boards/{board_id}/posts/{post_id}", delete(posts::delete_post))
        // Admin routes
        .route("/admin/ghost-mode", post(admin::set_ghost_mode))
        .route("/admin/ghost-mode/status", get(admin::ghost_mode_status))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/lock", post(admin::lock_user))
        .route("/admin/users/{user_id}/unlock", post(admin::unlock_user))
        .route("/admin/users/{user_id}/warn", post(admin::warn_user))
        .route("/admin/users/{user_id}/promote", post(admin::promote_user))
        .route("/admin/users/{user_id}", get(admin::get_user))
        .route("/admin/moderation-logs", get(admin::list_moderation_logs))
        .route("/admin/moderation-logs/{user_id}", get(admin::user_moderation_logs))
        .route("/admin/permissions", get(admin::permissions))
}

/// Common skip/limit pagination query
#[derive(Debug, serde::Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

impl Pagination {
    /// Cap page size so a caller cannot request the world
    pub fn clamped(&self, max: usize) -> (usize, usize) {
        (self.skip, self.limit.min(max))
    }
}
