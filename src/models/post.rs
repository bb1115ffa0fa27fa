use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// System bot identities. Bots author posts and moderation-log entries
/// without human authentication and bypass authorship-based checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotType {
    News,
    Haunt,
    Mod,
}

impl BotType {
    /// Stable author id recorded on bot-originated content
    pub fn author_id(&self) -> &'static str {
        match self {
            BotType::News => "news_bot",
            BotType::Haunt => "haunt_bot",
            BotType::Mod => "mod_bot",
        }
    }
}

/// A post within a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub thread_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_bot: bool,
    pub bot_type: Option<BotType>,
    pub ascii_art: Option<String>,
}

impl Post {
    pub fn new(thread_id: String, author_id: String, content: String, ascii_art: Option<String>) -> Self {
        Post {
            id: Uuid::new_v4().to_string(),
            thread_id,
            author_id,
            content,
            created_at: Utc::now(),
            is_bot: false,
            bot_type: None,
            ascii_art,
        }
    }

    /// Bot-originated post (reclamation revivals, news drops, mod notices)
    pub fn from_bot(thread_id: String, bot: BotType, content: String, ascii_art: Option<String>) -> Self {
        Post {
            id: Uuid::new_v4().to_string(),
            thread_id,
            author_id: bot.author_id().to_string(),
            content,
            created_at: Utc::now(),
            is_bot: true,
            bot_type: Some(bot),
            ascii_art,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    pub ascii_art: Option<String>,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_content(&self.content)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub content: String,
}

impl UpdatePostRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_content(&self.content)
    }
}

fn validate_content(content: &str) -> Result<(), &'static str> {
    let len = content.chars().count();
    if len == 0 {
        return Err("content cannot be empty");
    }
    if len > 5000 {
        return Err("content must be at most 5000 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_bounds() {
        assert!(validate_content("").is_err());
        assert!(validate_content("a").is_ok());
        assert!(validate_content(&"x".repeat(5000)).is_ok());
        assert!(validate_content(&"x".repeat(5001)).is_err());
    }

    #[test]
    fn test_bot_post_marked() {
        let post = Post::from_bot("t1".into(), BotType::Haunt, "rises again".into(), None);
        assert!(post.is_bot);
        assert_eq!(post.bot_type, Some(BotType::Haunt));
        assert_eq!(post.author_id, "haunt_bot");
    }
}
