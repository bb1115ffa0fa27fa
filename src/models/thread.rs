use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A discussion thread within a board.
///
/// `post_count` is maintained incrementally by the counted post-creation
/// path and is never recomputed. `is_resurrected` is one-way: set by the
/// reclamation sweep, never cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    /// Board this thread belongs to; not enforced referentially by storage
    pub board_id: String,
    pub author_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_locked: bool,
    pub is_pinned: bool,
    pub is_resurrected: bool,
    pub post_count: i64,
}

impl Thread {
    pub fn new(board_id: String, author_id: String, title: String) -> Self {
        let now = Utc::now();
        Thread {
            id: Uuid::new_v4().to_string(),
            board_id,
            author_id,
            title,
            created_at: now,
            updated_at: now,
            is_locked: false,
            is_pinned: false,
            is_resurrected: false,
            post_count: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    pub title: String,
}

impl CreateThreadRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        let len = self.title.chars().count();
        if len < 3 || len > 100 {
            return Err("title must be 3-100 characters");
        }
        Ok(())
    }
}

/// Partial thread update. Title edits follow ownership rules; the lock and
/// pin flags are admin-only, checked per field by the handler.
#[derive(Debug, Deserialize)]
pub struct UpdateThreadRequest {
    pub title: Option<String>,
    pub is_locked: Option<bool>,
    pub is_pinned: Option<bool>,
}

impl UpdateThreadRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(title) = &self.title {
            let len = title.chars().count();
            if len < 3 || len > 100 {
                return Err("title must be 3-100 characters");
            }
        }
        Ok(())
    }
}
