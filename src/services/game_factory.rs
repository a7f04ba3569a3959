// src/services/game_factory.rs

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::{
    error::{AppError, GameError},
    models::{
        game::Game,
        game_question::{GameQuestion, KeyShuffle},
        question::QUESTIONS_PER_GAME,
    },
    services::question_bank::QuestionBank,
};

/// Builds new games out of the question bank.
pub struct GameFactory;

impl GameFactory {
    /// Draws one question per level and freezes a random answer order for each.
    ///
    /// The caller is responsible for checking that `user_id` has no unfinished
    /// game. The returned game is not persisted yet.
    pub async fn create_game_for_user<B, R>(
        bank: &B,
        user_id: i64,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Game, AppError>
    where
        B: QuestionBank + ?Sized,
        R: Rng + Send + ?Sized,
    {
        let mut game_questions = Vec::with_capacity(QUESTIONS_PER_GAME);

        for level in 0..QUESTIONS_PER_GAME {
            let question = bank
                .fetch_one(level)
                .await?
                .ok_or(GameError::InsufficientQuestions { level })?;
            game_questions.push(GameQuestion::new(question, KeyShuffle::random(rng)));
        }

        tracing::debug!("Drew {} questions for user {}", game_questions.len(), user_id);

        Ok(Game::new(user_id, game_questions, now))
    }
}
