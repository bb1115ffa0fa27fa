//! Inactivity reclamation.
//!
//! A background sweep revives dormant threads: each gets the one-way
//! resurrected flag and a haunt-bot post through the counted post path, so
//! post_count and updated_at stay consistent with every other post.
//!
//! Each board's partition is swept independently; a failure on one
//! partition is logged and does not stop the others (there is no
//! cross-partition transaction to roll back).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::BoardRouter;
use crate::models::{BotType, Post};

const SWEEP_BATCH: usize = 50;

/// Start the periodic reclamation task
pub fn start_reclaim_task(boards: Arc<BoardRouter>, config: Arc<Config>) {
    let sweep_interval = Duration::from_secs(config.moderation.reclaim_interval_secs);

    tokio::spawn(async move {
        let mut ticker = interval(sweep_interval);

        loop {
            ticker.tick().await;

            match run_sweep(&boards, &config).await {
                Ok(revived) if revived > 0 => info!("resurrected {} dormant threads", revived),
                Ok(_) => {}
                Err(e) => error!("reclamation sweep error: {}", e),
            }
        }
    });
}

/// One full sweep across all boards; returns how many threads were revived
pub async fn run_sweep(boards: &BoardRouter, config: &Config) -> anyhow::Result<u64> {
    let cutoff = Utc::now() - chrono::Duration::hours(config.moderation.dormant_after_hours);
    let mut revived = 0u64;

    for board in boards.boards() {
        match sweep_board(boards, &board.id, cutoff).await {
            Ok(count) => revived += count,
            Err(e) => warn!(board_id = %board.id, "reclamation failed for board: {}", e),
        }
    }

    Ok(revived)
}

async fn sweep_board(
    boards: &BoardRouter,
    board_id: &str,
    cutoff: chrono::DateTime<Utc>,
) -> anyhow::Result<u64> {
    let db = boards.resolve(board_id);
    let dormant = db
        .find_dormant_threads(cutoff, SWEEP_BATCH)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let mut revived = 0u64;
    for thread in dormant {
        // The conditional flag set doubles as the claim: if another sweep
        // got here first, skip the revival post
        let claimed = db
            .mark_resurrected(&thread.id)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        if !claimed {
            continue;
        }

        let post = Post::from_bot(
            thread.id.clone(),
            BotType::Haunt,
            format!("*{}* stirs from its slumber...", thread.title),
            Some("👻 ~ r i s e ~ 👻".to_string()),
        );
        db.create_post(&post).await.map_err(|e| anyhow::anyhow!("{e}"))?;
        db.bump_post_count(&thread.id).await.map_err(|e| anyhow::anyhow!("{e}"))?;
        revived += 1;
    }

    Ok(revived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, ModerationConfig, ServerConfig};
    use crate::models::Thread;

    fn config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                cors_origins: "*".into(),
            },
            auth: AuthConfig {
                jwt_secret: "test-secret".into(),
                access_token_minutes: 30,
                refresh_token_days: 7,
            },
            moderation: ModerationConfig {
                default_lock_hours: 24,
                dormant_after_hours: 72,
                reclaim_interval_secs: 3600,
                reclaim_enabled: true,
            },
        }
    }

    #[tokio::test]
    async fn test_sweep_revives_dormant_threads_once() {
        let boards = BoardRouter::in_memory();
        let config = config();

        let db = boards.resolve("crypt");
        let mut dormant = Thread::new("crypt".into(), "u1".into(), "old bones".into());
        dormant.updated_at = Utc::now() - chrono::Duration::hours(100);
        db.create_thread(&dormant).await.unwrap();
        let fresh = Thread::new("crypt".into(), "u1".into(), "still warm".into());
        db.create_thread(&fresh).await.unwrap();

        let revived = run_sweep(&boards, &config).await.unwrap();
        assert_eq!(revived, 1);

        let thread = db.get_thread(&dormant.id).await.unwrap();
        assert!(thread.is_resurrected);
        assert_eq!(thread.post_count, 1);

        let posts = db.list_posts(&dormant.id, 0, 10).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].is_bot);
        assert_eq!(posts[0].bot_type, Some(BotType::Haunt));

        // The revival bumped updated_at, and the flag is one-way, so the
        // next sweep leaves the thread alone
        let revived_again = run_sweep(&boards, &config).await.unwrap();
        assert_eq!(revived_again, 0);
        assert_eq!(db.get_thread(&dormant.id).await.unwrap().post_count, 1);

        let untouched = db.get_thread(&fresh.id).await.unwrap();
        assert!(!untouched.is_resurrected);
    }
}
