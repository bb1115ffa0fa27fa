use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::{AppError, Result},
    models::BoardResponse,
    AppState,
};

/// List the provisioned board catalog
pub async fn list_boards(State(state): State<AppState>) -> Json<Vec<BoardResponse>> {
    Json(state.boards.boards().iter().map(BoardResponse::from).collect())
}

pub async fn get_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> Result<Json<BoardResponse>> {
    state
        .boards
        .board(&board_id)
        .map(|board| Json(BoardResponse::from(board)))
        .ok_or_else(|| AppError::NotFound(format!("Board '{}' not found", board_id)))
}
