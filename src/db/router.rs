//! Board router: maps a board id to its storage partition.
//!
//! Boards are provisioned once at startup; unknown board ids fall back to
//! the default partition. Users and moderation logs always live on the
//! default partition, threads and posts on the board's own cluster.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Board, ThemeConfig};

use super::{Db, MemoryPartition, StoreError};

pub struct BoardRouter {
    boards: Vec<Board>,
    partitions: HashMap<String, Db>,
    default_cluster: String,
}

impl BoardRouter {
    /// Provision the catalog, creating one partition per distinct cluster
    /// via `open`. The first board's cluster becomes the default partition.
    pub fn provision(boards: Vec<Board>, open: impl Fn(&str) -> Db) -> Self {
        let mut partitions = HashMap::new();
        for board in &boards {
            partitions
                .entry(board.cluster.clone())
                .or_insert_with(|| open(&board.cluster));
        }
        let default_cluster = boards
            .first()
            .map(|b| b.cluster.clone())
            .unwrap_or_else(|| "default".to_string());
        partitions
            .entry(default_cluster.clone())
            .or_insert_with(|| open(&default_cluster));

        BoardRouter { boards, partitions, default_cluster }
    }

    /// Standard catalog on bundled in-memory partitions
    pub fn in_memory() -> Self {
        Self::provision(catalog(), |_cluster| Db::new(Arc::new(MemoryPartition::new())))
    }

    /// Resolve the partition for a board, falling back to the default
    /// partition when the board id is unknown.
    pub fn resolve(&self, board_id: &str) -> &Db {
        self.boards
            .iter()
            .find(|b| b.id == board_id)
            .and_then(|b| self.partitions.get(&b.cluster))
            .unwrap_or_else(|| self.default_partition())
    }

    /// The designated default partition (also holds users and moderation logs)
    pub fn default_partition(&self) -> &Db {
        &self.partitions[&self.default_cluster]
    }

    pub fn board(&self, board_id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == board_id)
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    /// Create the index sets every partition needs. Unique constraints on
    /// user identity fields only matter on the default partition, but
    /// declaring them everywhere is harmless and keeps partitions uniform.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        for db in self.partitions.values() {
            db.partition().ensure_unique_index("users", "email").await?;
            db.partition().ensure_unique_index("users", "username").await?;
            db.partition().ensure_unique_index("threads", "id").await?;
            db.partition().ensure_unique_index("posts", "id").await?;
            db.partition().ensure_unique_index("moderation_logs", "id").await?;
        }
        Ok(())
    }
}

/// The provisioned board catalog. Boards are immutable descriptors; adding
/// one means adding a row here and (if isolated) a new cluster.
pub fn catalog() -> Vec<Board> {
    vec![
        Board {
            id: "crypt".to_string(),
            name: "crypt".to_string(),
            display_name: "The Crypt".to_string(),
            description: "Where threads rest... eternally".to_string(),
            theme_config: ThemeConfig {
                board_id: "crypt".to_string(),
                primary_font: "Creepster".to_string(),
                accent_font: "Courier New".to_string(),
                background_color: "#0a0a0a".to_string(),
                text_color: "#00ff00".to_string(),
                accent_color: "#ff0000".to_string(),
                border_style: "double".to_string(),
                ascii_art: "💀 THE CRYPT 💀".to_string(),
            },
            cluster: "crypt_cluster".to_string(),
        },
        Board {
            id: "parlor".to_string(),
            name: "parlor".to_string(),
            display_name: "The Parlor".to_string(),
            description: "Polite conversation with the departed".to_string(),
            theme_config: ThemeConfig {
                board_id: "parlor".to_string(),
                primary_font: "Old Standard TT".to_string(),
                accent_font: "Georgia".to_string(),
                background_color: "#1a1418".to_string(),
                text_color: "#e8dcc8".to_string(),
                accent_color: "#8b0000".to_string(),
                border_style: "solid".to_string(),
                ascii_art: "🕯️ THE PARLOR 🕯️".to_string(),
            },
            cluster: "parlor_cluster".to_string(),
        },
        Board {
            id: "comedy-night".to_string(),
            name: "comedy-night".to_string(),
            display_name: "Comedy Night".to_string(),
            description: "Dead crowd, killer material".to_string(),
            theme_config: ThemeConfig {
                board_id: "comedy-night".to_string(),
                primary_font: "Comic Neue".to_string(),
                accent_font: "Courier New".to_string(),
                background_color: "#0d0d1a".to_string(),
                text_color: "#ffcc00".to_string(),
                accent_color: "#ff00ff".to_string(),
                border_style: "dashed".to_string(),
                ascii_art: "🎭 COMEDY NIGHT 🎭".to_string(),
            },
            cluster: "comedy_cluster".to_string(),
        },
    ]
}
