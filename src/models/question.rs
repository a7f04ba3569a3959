// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Number of questions in one game, one per level.
pub const QUESTIONS_PER_GAME: usize = 15;

/// Highest (hardest) question level.
pub const MAX_LEVEL: usize = QUESTIONS_PER_GAME - 1;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// Difficulty tier, 0..=14.
    pub level: i64,

    /// The text content of the question.
    pub text: String,

    /// The correct answer. Stored in slot 1 so that presentation order is
    /// decided per game by the key shuffle.
    pub answer1: String,
    pub answer2: String,
    pub answer3: String,
    pub answer4: String,

    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Returns the answer stored in `slot` (1-based).
    pub fn answer(&self, slot: u8) -> Option<&str> {
        match slot {
            1 => Some(&self.answer1),
            2 => Some(&self.answer2),
            3 => Some(&self.answer3),
            4 => Some(&self.answer4),
            _ => None,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(range(min = 0, max = 14, message = "Level must be between 0 and 14."))]
    pub level: i64,
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    /// Four answers, the first one being the correct one.
    #[validate(custom(function = validate_answers))]
    pub answers: Vec<String>,
}

fn validate_answers(answers: &[String]) -> Result<(), validator::ValidationError> {
    if answers.len() != 4 {
        return Err(validator::ValidationError::new("exactly_four_answers_required"));
    }
    for answer in answers {
        if answer.trim().is_empty() {
            return Err(validator::ValidationError::new("answer_cannot_be_empty"));
        }
        if answer.len() > 500 {
            return Err(validator::ValidationError::new("answer_too_long"));
        }
    }
    Ok(())
}

/// Number of questions available at one level.
#[derive(Debug, Serialize, FromRow)]
pub struct LevelStats {
    pub level: i64,
    pub count: i64,
}
