//! User operations and the account lock state machine.
//!
//! Lock transitions are expressed as conditional single-document updates so
//! racing requests cannot lose writes: two readers healing the same stale
//! lock both issue the same idempotent unlock and converge on Active.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Role, User};

use super::{from_doc, to_doc, Filter, Order, Sort, Update};

const USERS: &str = "users";

impl super::Db {
    pub async fn create_user(&self, user: &User) -> Result<()> {
        self.partition().insert_one(USERS, to_doc(user)?).await?;
        Ok(())
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.find_user(Filter::by_id(id)).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user(Filter::all().eq("email", email)).await
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_user(Filter::all().eq("username", username)).await
    }

    async fn find_user(&self, filter: Filter) -> Result<Option<User>> {
        match self.partition().find_one(USERS, &filter).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn get_user(&self, id: &str) -> Result<User> {
        self.find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Reconciling read: the plain read plus stale-lock healing.
    ///
    /// Every authentication and authorization path goes through this, never
    /// through `get_user` directly. When the stored lock has expired the
    /// unlock is persisted before the user is returned, so storage
    /// self-heals without a timer process.
    pub async fn get_user_reconciled(&self, id: &str) -> Result<User> {
        let user = self.get_user(id).await?;
        self.reconcile_lock(user).await
    }

    /// Clear an expired lock in storage and in the returned value.
    /// The update is conditioned on `is_locked` still being set, which makes
    /// the concurrent-healing race a no-op for the loser.
    pub async fn reconcile_lock(&self, mut user: User) -> Result<User> {
        if user.lock_is_stale(Utc::now()) {
            self.partition()
                .update_one(
                    USERS,
                    &Filter::by_id(&user.id).eq("is_locked", true),
                    &Update::new()
                        .set("is_locked", false)
                        .set("lock_expires_at", Value::Null),
                )
                .await?;
            user.is_locked = false;
            user.lock_expires_at = None;
        }
        Ok(user)
    }

    /// Active -> Locked(expires_at), one atomic update
    pub async fn lock_user(&self, id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let updated = self
            .partition()
            .update_one(
                USERS,
                &Filter::by_id(id),
                &Update::new()
                    .set("is_locked", true)
                    .set("lock_expires_at", expires_at.to_rfc3339()),
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    /// Locked -> Active, explicit admin transition
    pub async fn unlock_user(&self, id: &str) -> Result<()> {
        let updated = self
            .partition()
            .update_one(
                USERS,
                &Filter::by_id(id),
                &Update::new()
                    .set("is_locked", false)
                    .set("lock_expires_at", Value::Null),
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    /// Atomic counter bump; returns the count as read after the increment.
    /// The counter is monotonic and never reset by the core.
    pub async fn increment_spam_warnings(&self, id: &str) -> Result<i64> {
        let updated = self
            .partition()
            .update_one(USERS, &Filter::by_id(id), &Update::new().inc("spam_warnings", 1))
            .await?;
        if !updated {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        let user = self.get_user(id).await?;
        Ok(user.spam_warnings)
    }

    pub async fn promote_to_admin(&self, id: &str) -> Result<User> {
        let role = serde_json::to_value(Role::Admin)
            .map_err(|e| AppError::Storage(e.to_string()))?;
        let updated = self
            .partition()
            .update_one(USERS, &Filter::by_id(id), &Update::new().set("role", role))
            .await?;
        if !updated {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        self.get_user(id).await
    }

    /// Paginated listing for admin user management, newest accounts first
    pub async fn list_users(&self, skip: usize, limit: usize) -> Result<Vec<User>> {
        let docs = self
            .partition()
            .find_many(
                USERS,
                &Filter::all(),
                &Sort::by("created_at", Order::Desc),
                skip,
                limit,
            )
            .await?;
        docs.into_iter()
            .map(|doc| from_doc(doc).map_err(AppError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Db, MemoryPartition};
    use chrono::Duration;
    use std::sync::Arc;

    fn db() -> Db {
        Db::new(Arc::new(MemoryPartition::new()))
    }

    async fn seed(db: &Db) -> User {
        let user = User::new("ghost_user".into(), "ghost@x.com".into(), "digest".into());
        db.create_user(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_lock_then_read() {
        let db = db();
        let user = seed(&db).await;

        let expires = Utc::now() + Duration::hours(24);
        db.lock_user(&user.id, expires).await.unwrap();

        let read = db.get_user(&user.id).await.unwrap();
        assert!(read.is_locked);
        let stored = read.lock_expires_at.unwrap();
        assert!((stored - expires).num_seconds().abs() < 1);
    }

    #[tokio::test]
    async fn test_reconciling_read_heals_stale_lock_in_storage() {
        let db = db();
        let user = seed(&db).await;
        db.lock_user(&user.id, Utc::now() - Duration::seconds(5)).await.unwrap();

        let healed = db.get_user_reconciled(&user.id).await.unwrap();
        assert!(!healed.is_locked);
        assert!(healed.lock_expires_at.is_none());

        // The unlock was persisted, not just applied in memory
        let reread = db.get_user(&user.id).await.unwrap();
        assert!(!reread.is_locked);
        assert!(reread.lock_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_reconciling_read_leaves_live_lock_alone() {
        let db = db();
        let user = seed(&db).await;
        let expires = Utc::now() + Duration::hours(1);
        db.lock_user(&user.id, expires).await.unwrap();

        let read = db.get_user_reconciled(&user.id).await.unwrap();
        assert!(read.is_locked);
        assert!(read.lock_expires_at.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_stale_lock_healing_converges() {
        let db = db();
        let user = seed(&db).await;
        db.lock_user(&user.id, Utc::now() - Duration::seconds(1)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let id = user.id.clone();
            handles.push(tokio::spawn(async move {
                db.get_user_reconciled(&id).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(!handle.await.unwrap().is_locked);
        }
    }

    #[tokio::test]
    async fn test_spam_warnings_monotonic_under_concurrency() {
        let db = db();
        let user = seed(&db).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let db = db.clone();
            let id = user.id.clone();
            handles.push(tokio::spawn(async move {
                db.increment_spam_warnings(&id).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let user = db.get_user(&user.id).await.unwrap();
        assert_eq!(user.spam_warnings, 20);
    }

    #[tokio::test]
    async fn test_unique_email_and_username_conflict() {
        let db = db();
        db.partition().ensure_unique_index("users", "email").await.unwrap();
        db.partition().ensure_unique_index("users", "username").await.unwrap();
        seed(&db).await;

        let dup_email = User::new("other".into(), "ghost@x.com".into(), "digest".into());
        let err = db.create_user(&dup_email).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let dup_name = User::new("ghost_user".into(), "new@x.com".into(), "digest".into());
        let err = db.create_user(&dup_name).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_promote_and_list() {
        let db = db();
        let user = seed(&db).await;

        let promoted = db.promote_to_admin(&user.id).await.unwrap();
        assert_eq!(promoted.role, Role::Admin);

        let listed = db.list_users(0, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, user.id);
    }

    #[tokio::test]
    async fn test_user_round_trips_unchanged() {
        let db = db();
        let user = seed(&db).await;
        let read = db.get_user(&user.id).await.unwrap();
        assert_eq!(serde_json::to_value(&user).unwrap(), serde_json::to_value(&read).unwrap());
    }
}
