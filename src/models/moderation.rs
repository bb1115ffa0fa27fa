use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Warning,
    Lock,
    Unlock,
    Delete,
}

/// Immutable audit record of a moderator (or bot) action.
/// Append-only: never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationLog {
    pub id: String,
    /// The user the action was taken against
    pub user_id: String,
    pub action: ModerationAction,
    pub reason: String,
    /// Bot id ("mod_bot") or the acting admin's user id
    pub performed_by: String,
    pub timestamp: DateTime<Utc>,
    pub post_id: Option<String>,
}

impl ModerationLog {
    pub fn new(
        user_id: String,
        action: ModerationAction,
        reason: String,
        performed_by: String,
        post_id: Option<String>,
    ) -> Self {
        ModerationLog {
            id: Uuid::new_v4().to_string(),
            user_id,
            action,
            reason,
            performed_by,
            timestamp: Utc::now(),
            post_id,
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.reason.chars().count() > 500 {
            return Err("reason must be at most 500 characters");
        }
        Ok(())
    }
}
