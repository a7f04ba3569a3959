// src/services/question_bank.rs

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{error::AppError, models::question::Question};

/// Source of candidate questions for new games.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Picks one random question of the given level, if any exists.
    async fn fetch_one(&self, level: usize) -> Result<Option<Question>, AppError>;
}

/// Question bank backed by the `questions` table.
#[derive(Clone)]
pub struct SqlQuestionBank {
    pool: SqlitePool,
}

impl SqlQuestionBank {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionBank for SqlQuestionBank {
    async fn fetch_one(&self, level: usize) -> Result<Option<Question>, AppError> {
        sqlx::query_as::<_, Question>(
            r#"
            SELECT id, level, text, answer1, answer2, answer3, answer4, created_at
            FROM questions
            WHERE level = ?
            ORDER BY RANDOM()
            LIMIT 1
            "#,
        )
        .bind(level as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch question for level {}: {:?}", level, e);
            AppError::InternalServerError(e.to_string())
        })
    }
}
