use serde::{Deserialize, Serialize};

/// Visual theme for a board, rendered by the frontend as-is
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub board_id: String,
    pub primary_font: String,
    pub accent_font: String,
    pub background_color: String,
    pub text_color: String,
    pub accent_color: String,
    pub border_style: String,
    pub ascii_art: String,
}

/// A board: a named forum partition descriptor.
///
/// Immutable after provisioning. `cluster` names the storage partition that
/// holds the board's threads and posts; normal traffic never mutates a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub theme_config: ThemeConfig,
    pub cluster: String,
}

/// Public view of a board (cluster routing stays internal)
#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub theme_config: ThemeConfig,
}

impl From<&Board> for BoardResponse {
    fn from(board: &Board) -> Self {
        BoardResponse {
            id: board.id.clone(),
            name: board.name.clone(),
            display_name: board.display_name.clone(),
            description: board.description.clone(),
            theme_config: board.theme_config.clone(),
        }
    }
}
