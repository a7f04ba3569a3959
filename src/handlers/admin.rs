// src/handlers/admin.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, LevelStats},
    utils::html::clean_html,
};

/// Adds a question to the bank.
/// Admin only. The first answer is the correct one.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let text = clean_html(&payload.text);
    let answers: Vec<String> = payload.answers.iter().map(|a| clean_html(a)).collect();
    if text.is_empty() || answers.iter().any(|a| a.is_empty()) {
        return Err(AppError::BadRequest(
            "Question and answers must not be empty after sanitizing".to_string(),
        ));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO questions (level, text, answer1, answer2, answer3, answer4, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.level)
    .bind(&text)
    .bind(&answers[0])
    .bind(&answers[1])
    .bind(&answers[2])
    .bind(&answers[3])
    .bind(Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .last_insert_rowid();

    tracing::info!("Question {} added at level {}", id, payload.level);

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Number of questions available per level.
/// Admin only. Every level needs at least one question before games can start.
pub async fn question_stats(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let stats = sqlx::query_as::<_, LevelStats>(
        "SELECT level, COUNT(*) AS count FROM questions GROUP BY level ORDER BY level",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to count questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(stats))
}
