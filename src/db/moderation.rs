//! Moderation log: append-only audit trail. Entries are never updated or
//! deleted by anything in this crate.

use crate::error::{AppError, Result};
use crate::models::{ModerationAction, ModerationLog};

use super::{from_doc, to_doc, Filter, Order, Sort};

const LOGS: &str = "moderation_logs";

impl super::Db {
    pub async fn append_moderation_log(&self, log: &ModerationLog) -> Result<()> {
        log.validate().map_err(|msg| AppError::Validation(msg.to_string()))?;
        self.partition().insert_one(LOGS, to_doc(log)?).await?;
        Ok(())
    }

    pub async fn recent_moderation_logs(&self, skip: usize, limit: usize)
        -> Result<Vec<ModerationLog>>
    {
        let docs = self
            .partition()
            .find_many(LOGS, &Filter::all(), &Sort::by("timestamp", Order::Desc), skip, limit)
            .await?;
        docs.into_iter()
            .map(|doc| from_doc(doc).map_err(AppError::from))
            .collect()
    }

    pub async fn moderation_logs_for_user(&self, user_id: &str, skip: usize, limit: usize)
        -> Result<Vec<ModerationLog>>
    {
        let docs = self
            .partition()
            .find_many(
                LOGS,
                &Filter::all().eq("user_id", user_id),
                &Sort::by("timestamp", Order::Desc),
                skip,
                limit,
            )
            .await?;
        docs.into_iter()
            .map(|doc| from_doc(doc).map_err(AppError::from))
            .collect()
    }

    pub async fn count_user_actions(&self, user_id: &str, action: ModerationAction)
        -> Result<u64>
    {
        let action_value = serde_json::to_value(action)
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(self
            .partition()
            .count(LOGS, &Filter::all().eq("user_id", user_id).eq("action", action_value))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Db, MemoryPartition};
    use std::sync::Arc;

    fn db() -> Db {
        Db::new(Arc::new(MemoryPartition::new()))
    }

    #[tokio::test]
    async fn test_append_and_list_newest_first() {
        let db = db();
        for i in 0..3 {
            let mut log = ModerationLog::new(
                "u1".into(),
                ModerationAction::Warning,
                format!("spam {}", i),
                "mod_bot".into(),
                None,
            );
            log.timestamp = chrono::Utc::now() + chrono::Duration::seconds(i);
            db.append_moderation_log(&log).await.unwrap();
        }

        let logs = db.recent_moderation_logs(0, 10).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].reason, "spam 2");

        assert_eq!(
            db.count_user_actions("u1", ModerationAction::Warning).await.unwrap(),
            3
        );
        assert_eq!(
            db.count_user_actions("u1", ModerationAction::Lock).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_reason_length_enforced() {
        let db = db();
        let log = ModerationLog::new(
            "u1".into(),
            ModerationAction::Lock,
            "x".repeat(501),
            "admin".into(),
            None,
        );
        assert!(matches!(
            db.append_moderation_log(&log).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }
}
