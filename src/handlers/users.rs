// src/handlers/users.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        game::GameRules,
        user::{User, UserProfileResponse},
    },
    services::game_store::GameStore,
};

/// Public profile of a player with their game history, newest first.
pub async fn show_profile(
    State(pool): State<SqlitePool>,
    State(rules): State<GameRules>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, balance, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    let games = GameStore::new(pool).list_for_user(user.id, &rules).await?;

    Ok(Json(UserProfileResponse {
        id: user.id,
        username: user.username,
        balance: user.balance,
        created_at: user.created_at,
        games,
    }))
}
