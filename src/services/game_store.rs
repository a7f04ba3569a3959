// src/services/game_store.rs

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool, prelude::FromRow, types::Json};

use crate::{
    error::AppError,
    models::{
        game::{Game, GameRules, GameSummary, Payout, derive_status},
        game_question::{GameQuestion, KeyShuffle},
        help::HelpHash,
        question::Question,
    },
};

/// Helper struct for reading the 'games' table.
#[derive(FromRow)]
struct GameRow {
    id: i64,
    user_id: i64,
    current_level: i64,
    is_failed: bool,
    finished_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    prize: i64,
    audience_help_used: bool,
    fifty_fifty_used: bool,
    friend_call_used: bool,
    version: i64,
}

/// Helper struct for reading a game question joined with its question.
#[derive(FromRow)]
struct GameQuestionRow {
    id: i64,
    game_id: i64,
    a: i64,
    b: i64,
    c: i64,
    d: i64,
    help_hash: Json<HelpHash>,
    question_id: i64,
    level: i64,
    text: String,
    answer1: String,
    answer2: String,
    answer3: String,
    answer4: String,
    question_created_at: DateTime<Utc>,
}

const GAME_COLUMNS: &str = "id, user_id, current_level, is_failed, finished_at, created_at, prize, \
     audience_help_used, fifty_fifty_used, friend_call_used, version";

fn level_from_row(level: i64) -> Result<usize, AppError> {
    usize::try_from(level)
        .map_err(|_| AppError::InternalServerError(format!("Corrupt game level {}", level)))
}

fn slot_from_row(slot: i64) -> Result<u8, AppError> {
    u8::try_from(slot)
        .map_err(|_| AppError::InternalServerError(format!("Corrupt answer slot {}", slot)))
}

impl GameQuestionRow {
    fn into_game_question(self) -> Result<GameQuestion, AppError> {
        let key_shuffle = KeyShuffle::new(
            slot_from_row(self.a)?,
            slot_from_row(self.b)?,
            slot_from_row(self.c)?,
            slot_from_row(self.d)?,
        )
        .ok_or_else(|| {
            AppError::InternalServerError(format!("Corrupt key shuffle on game question {}", self.id))
        })?;

        Ok(GameQuestion {
            id: self.id,
            game_id: self.game_id,
            question: Question {
                id: self.question_id,
                level: self.level,
                text: self.text,
                answer1: self.answer1,
                answer2: self.answer2,
                answer3: self.answer3,
                answer4: self.answer4,
                created_at: self.question_created_at,
            },
            key_shuffle,
            help_hash: self.help_hash.0,
        })
    }
}

/// Persistence for games and their questions.
///
/// Every update is guarded by the game's `version`; a stale write is rejected
/// with `AppError::Conflict` instead of overwriting a concurrent one.
#[derive(Clone)]
pub struct GameStore {
    pool: SqlitePool,
}

impl GameStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stores a freshly built game with all its questions, assigning ids.
    pub async fn insert(&self, mut game: Game) -> Result<Game, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO games (user_id, current_level, is_failed, finished_at, created_at, prize,
                audience_help_used, fifty_fifty_used, friend_call_used, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(game.user_id)
        .bind(game.current_level as i64)
        .bind(game.is_failed)
        .bind(game.finished_at)
        .bind(game.created_at)
        .bind(game.prize)
        .bind(game.audience_help_used)
        .bind(game.fifty_fifty_used)
        .bind(game.friend_call_used)
        .bind(game.version)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                AppError::Conflict("User already has a game in progress".to_string())
            } else {
                tracing::error!("Failed to insert game: {:?}", e);
                AppError::from(e)
            }
        })?;

        game.id = result.last_insert_rowid();

        for gq in &mut game.game_questions {
            let [a, b, c, d] = gq.key_shuffle.slots();
            let inserted = sqlx::query(
                r#"
                INSERT INTO game_questions (game_id, question_id, a, b, c, d, help_hash)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(game.id)
            .bind(gq.question.id)
            .bind(a as i64)
            .bind(b as i64)
            .bind(c as i64)
            .bind(d as i64)
            .bind(Json(&gq.help_hash))
            .execute(&mut *tx)
            .await?;

            gq.id = inserted.last_insert_rowid();
            gq.game_id = game.id;
        }

        tx.commit().await?;

        Ok(game)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Game>, AppError> {
        let row = sqlx::query_as::<_, GameRow>(&format!(
            "SELECT {} FROM games WHERE id = ?",
            GAME_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_unfinished_for_user(&self, user_id: i64) -> Result<Option<Game>, AppError> {
        let row = sqlx::query_as::<_, GameRow>(&format!(
            "SELECT {} FROM games WHERE user_id = ? AND finished_at IS NULL",
            GAME_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }

    /// Game history of a user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        rules: &GameRules,
    ) -> Result<Vec<GameSummary>, AppError> {
        let rows = sqlx::query_as::<_, GameRow>(&format!(
            "SELECT {} FROM games WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            GAME_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let current_level = level_from_row(row.current_level)?;
                Ok(GameSummary {
                    id: row.id,
                    status: derive_status(
                        row.finished_at,
                        row.created_at,
                        row.is_failed,
                        current_level,
                        rules.time_limit,
                    ),
                    current_level,
                    prize: row.prize,
                    created_at: row.created_at,
                    finished_at: row.finished_at,
                })
            })
            .collect()
    }

    /// Persists a move that left the game in progress.
    pub async fn save(&self, game: &mut Game) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        write_game(&mut *tx, game).await?;
        tx.commit().await?;

        game.version += 1;
        Ok(())
    }

    /// Persists a finished game and credits its prize to the owner, atomically.
    pub async fn finish(&self, game: &mut Game) -> Result<Option<Payout>, AppError> {
        let payout = game.payout();

        let mut tx = self.pool.begin().await?;
        write_game(&mut *tx, game).await?;

        if let Some(payout) = payout {
            let credited = sqlx::query("UPDATE users SET balance = balance + ? WHERE id = ?")
                .bind(payout.amount)
                .bind(payout.user_id)
                .execute(&mut *tx)
                .await?;

            if credited.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("User {} not found", payout.user_id)));
            }
        }

        tx.commit().await?;
        game.version += 1;

        if let Some(payout) = payout {
            tracing::info!(
                "Credited {} to user {} for game {}",
                payout.amount,
                payout.user_id,
                game.id
            );
        }

        Ok(payout)
    }

    async fn load(&self, row: GameRow) -> Result<Game, AppError> {
        let question_rows = sqlx::query_as::<_, GameQuestionRow>(
            r#"
            SELECT
                gq.id, gq.game_id, gq.a, gq.b, gq.c, gq.d, gq.help_hash,
                q.id AS question_id, q.level, q.text,
                q.answer1, q.answer2, q.answer3, q.answer4,
                q.created_at AS question_created_at
            FROM game_questions gq
            JOIN questions q ON q.id = gq.question_id
            WHERE gq.game_id = ?
            ORDER BY q.level, gq.id
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let game_questions = question_rows
            .into_iter()
            .map(GameQuestionRow::into_game_question)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Game {
            id: row.id,
            user_id: row.user_id,
            game_questions,
            current_level: level_from_row(row.current_level)?,
            is_failed: row.is_failed,
            finished_at: row.finished_at,
            created_at: row.created_at,
            prize: row.prize,
            audience_help_used: row.audience_help_used,
            fifty_fifty_used: row.fifty_fifty_used,
            friend_call_used: row.friend_call_used,
            version: row.version,
        })
    }
}

/// Writes the mutable part of a game. Fails if the stored version moved on.
async fn write_game(conn: &mut SqliteConnection, game: &Game) -> Result<(), AppError> {
    let updated = sqlx::query(
        r#"
        UPDATE games SET
            current_level = ?,
            is_failed = ?,
            finished_at = ?,
            prize = ?,
            audience_help_used = ?,
            fifty_fifty_used = ?,
            friend_call_used = ?,
            version = version + 1
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(game.current_level as i64)
    .bind(game.is_failed)
    .bind(game.finished_at)
    .bind(game.prize)
    .bind(game.audience_help_used)
    .bind(game.fifty_fifty_used)
    .bind(game.friend_call_used)
    .bind(game.id)
    .bind(game.version)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        tracing::warn!("Stale write rejected for game {} (version {})", game.id, game.version);
        return Err(AppError::Conflict(format!(
            "Game {} was changed by another request",
            game.id
        )));
    }

    // Helps only ever land on the question currently being asked.
    if let Some(gq) = game
        .current_game_question()
        .ok()
        .filter(|gq| !gq.help_hash.is_empty())
    {
        sqlx::query("UPDATE game_questions SET help_hash = ? WHERE id = ?")
            .bind(Json(&gq.help_hash))
            .bind(gq.id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}
