//! Post operations. Reading order within a thread is strictly chronological.

use crate::error::{AppError, Result};
use crate::models::Post;

use super::{from_doc, to_doc, Filter, Order, Sort, Update};

const POSTS: &str = "posts";

impl super::Db {
    pub async fn create_post(&self, post: &Post) -> Result<()> {
        self.partition().insert_one(POSTS, to_doc(post)?).await?;
        Ok(())
    }

    pub async fn get_post(&self, id: &str) -> Result<Post> {
        match self.partition().find_one(POSTS, &Filter::by_id(id)).await? {
            Some(doc) => Ok(from_doc(doc)?),
            None => Err(AppError::NotFound("Post not found".to_string())),
        }
    }

    pub async fn list_posts(&self, thread_id: &str, skip: usize, limit: usize)
        -> Result<Vec<Post>>
    {
        let docs = self
            .partition()
            .find_many(
                POSTS,
                &Filter::all().eq("thread_id", thread_id),
                &Sort::by("created_at", Order::Asc),
                skip,
                limit,
            )
            .await?;
        docs.into_iter()
            .map(|doc| from_doc(doc).map_err(AppError::from))
            .collect()
    }

    pub async fn update_post_content(&self, id: &str, content: &str) -> Result<()> {
        let updated = self
            .partition()
            .update_one(POSTS, &Filter::by_id(id), &Update::new().set("content", content))
            .await?;
        if !updated {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete_post(&self, id: &str) -> Result<()> {
        let deleted = self.partition().delete_one(POSTS, &Filter::by_id(id)).await?;
        if !deleted {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Db, MemoryPartition};
    use crate::models::BotType;
    use std::sync::Arc;

    fn db() -> Db {
        Db::new(Arc::new(MemoryPartition::new()))
    }

    #[tokio::test]
    async fn test_posts_listed_in_chronological_order() {
        let db = db();
        let mut ids = Vec::new();
        for i in 0..4 {
            let mut post = Post::new("t1".into(), "u1".into(), format!("message {}", i), None);
            post.created_at = chrono::Utc::now() + chrono::Duration::seconds(i);
            db.create_post(&post).await.unwrap();
            ids.push(post.id);
        }
        // Insert one out of band to make sure filtering holds
        db.create_post(&Post::new("t2".into(), "u1".into(), "other thread".into(), None))
            .await
            .unwrap();

        let listed = db.list_posts("t1", 0, 10).await.unwrap();
        let listed_ids: Vec<_> = listed.iter().map(|p| p.id.clone()).collect();
        assert_eq!(listed_ids, ids);
    }

    #[tokio::test]
    async fn test_post_round_trips_with_bot_fields() {
        let db = db();
        let post = Post::from_bot("t1".into(), BotType::News, "breaking".into(), Some("~art~".into()));
        db.create_post(&post).await.unwrap();

        let read = db.get_post(&post.id).await.unwrap();
        assert_eq!(
            serde_json::to_value(&post).unwrap(),
            serde_json::to_value(&read).unwrap()
        );
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let db = db();
        let post = Post::new("t1".into(), "u1".into(), "first draft".into(), None);
        db.create_post(&post).await.unwrap();

        db.update_post_content(&post.id, "second draft").await.unwrap();
        assert_eq!(db.get_post(&post.id).await.unwrap().content, "second draft");

        db.delete_post(&post.id).await.unwrap();
        assert!(matches!(
            db.get_post(&post.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
