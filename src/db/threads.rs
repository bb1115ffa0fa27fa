//! Thread operations.
//!
//! `bump_post_count` is the only write path for `post_count`: one atomic
//! update carrying both the increment and the `updated_at` touch, so
//! concurrent posts never lose an increment.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::Thread;

use super::{from_doc, to_doc, Filter, Order, Sort, Update};

const THREADS: &str = "threads";

impl super::Db {
    pub async fn create_thread(&self, thread: &Thread) -> Result<()> {
        self.partition().insert_one(THREADS, to_doc(thread)?).await?;
        Ok(())
    }

    pub async fn get_thread(&self, id: &str) -> Result<Thread> {
        match self.partition().find_one(THREADS, &Filter::by_id(id)).await? {
            Some(doc) => Ok(from_doc(doc)?),
            None => Err(AppError::NotFound("Thread not found".to_string())),
        }
    }

    /// Board listing order: pinned first, then most recently updated
    pub async fn list_threads(&self, board_id: &str, skip: usize, limit: usize)
        -> Result<Vec<Thread>>
    {
        let docs = self
            .partition()
            .find_many(
                THREADS,
                &Filter::all().eq("board_id", board_id),
                &Sort::by("is_pinned", Order::Desc).then("updated_at", Order::Desc),
                skip,
                limit,
            )
            .await?;
        docs.into_iter()
            .map(|doc| from_doc(doc).map_err(AppError::from))
            .collect()
    }

    /// Counted post path: increment `post_count` and touch `updated_at` as a
    /// single logical step. Callers must not bypass this when creating posts.
    pub async fn bump_post_count(&self, id: &str) -> Result<()> {
        let updated = self
            .partition()
            .update_one(
                THREADS,
                &Filter::by_id(id),
                &Update::new()
                    .inc("post_count", 1)
                    .set("updated_at", Utc::now().to_rfc3339()),
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound("Thread not found".to_string()));
        }
        Ok(())
    }

    pub async fn set_thread_title(&self, id: &str, title: &str) -> Result<()> {
        self.update_thread(id, Update::new().set("title", title)).await
    }

    pub async fn set_thread_locked(&self, id: &str, locked: bool) -> Result<()> {
        self.update_thread(id, Update::new().set("is_locked", locked)).await
    }

    pub async fn set_thread_pinned(&self, id: &str, pinned: bool) -> Result<()> {
        self.update_thread(id, Update::new().set("is_pinned", pinned)).await
    }

    async fn update_thread(&self, id: &str, update: Update) -> Result<()> {
        let updated = self
            .partition()
            .update_one(THREADS, &Filter::by_id(id), &update)
            .await?;
        if !updated {
            return Err(AppError::NotFound("Thread not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete_thread(&self, id: &str) -> Result<()> {
        let deleted = self.partition().delete_one(THREADS, &Filter::by_id(id)).await?;
        if !deleted {
            return Err(AppError::NotFound("Thread not found".to_string()));
        }
        Ok(())
    }

    /// Candidates for the reclamation sweep: threads untouched since
    /// `cutoff`, excluding locked and already resurrected ones.
    pub async fn find_dormant_threads(&self, cutoff: DateTime<Utc>, limit: usize)
        -> Result<Vec<Thread>>
    {
        let docs = self
            .partition()
            .find_many(
                THREADS,
                &Filter::all()
                    .lt("updated_at", cutoff.to_rfc3339())
                    .eq("is_resurrected", false)
                    .eq("is_locked", false),
                &Sort::by("updated_at", Order::Asc),
                0,
                limit,
            )
            .await?;
        docs.into_iter()
            .map(|doc| from_doc(doc).map_err(AppError::from))
            .collect()
    }

    /// One-way transition; conditioned on the flag still being unset so a
    /// racing sweep claims each thread at most once.
    pub async fn mark_resurrected(&self, id: &str) -> Result<bool> {
        let updated = self
            .partition()
            .update_one(
                THREADS,
                &Filter::by_id(id).eq("is_resurrected", false),
                &Update::new().set("is_resurrected", true),
            )
            .await?;
        Ok(updated)
    }
}
