// src/handlers/games.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use rand::{SeedableRng, rngs::StdRng};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, GameError},
    models::game::{
        AnswerRequest, AnswerResponse, Game, GameRules, GameView, HelpRequest, TakeMoneyResponse,
    },
    services::{game_factory::GameFactory, game_store::GameStore, question_bank::SqlQuestionBank},
    utils::jwt::Claims,
};

/// Loads a game and checks that the caller owns it.
async fn load_owned_game(store: &GameStore, id: i64, claims: &Claims) -> Result<Game, AppError> {
    let user_id = claims.user_id()?;

    let game = store
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Game {} not found", id)))?;

    if game.user_id != user_id {
        tracing::warn!("User {} tried to access game {} of user {}", user_id, id, game.user_id);
        return Err(AppError::Forbidden("This is not your game".to_string()));
    }

    Ok(game)
}

/// Finishes the game if its clock ran out. Returns `true` if it did.
async fn expire_if_stale(store: &GameStore, game: &mut Game, rules: &GameRules) -> Result<bool, AppError> {
    if !game.time_out(rules, Utc::now()) {
        return Ok(false);
    }
    store.finish(game).await?;
    tracing::info!("Game {} timed out at level {}", game.id, game.current_level);
    Ok(true)
}

/// Starts a new game for the current user.
///
/// If the user already has a game running, nothing is created and the
/// response is 409 with the id of that game.
pub async fn create_game(
    State(pool): State<SqlitePool>,
    State(rules): State<GameRules>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let user_id = claims.user_id()?;
    let store = GameStore::new(pool.clone());

    if let Some(mut running) = store.find_unfinished_for_user(user_id).await? {
        if !expire_if_stale(&store, &mut running, &rules).await? {
            let body = Json(json!({
                "error": "You have a game in progress",
                "game_id": running.id,
            }));
            return Ok((StatusCode::CONFLICT, body).into_response());
        }
    }

    let bank = SqlQuestionBank::new(pool);
    let mut rng = StdRng::from_entropy();
    let game = GameFactory::create_game_for_user(&bank, user_id, &mut rng, Utc::now()).await?;
    let game = store.insert(game).await?;

    tracing::info!("User {} started game {}", user_id, game.id);

    Ok((StatusCode::CREATED, Json(GameView::new(&game, &rules))).into_response())
}

/// Shows one of the caller's games.
pub async fn show_game(
    State(pool): State<SqlitePool>,
    State(rules): State<GameRules>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let store = GameStore::new(pool);
    let mut game = load_owned_game(&store, id, &claims).await?;

    expire_if_stale(&store, &mut game, &rules).await?;

    Ok(Json(GameView::new(&game, &rules)))
}

/// Answers the current question of a game.
pub async fn answer(
    State(pool): State<SqlitePool>,
    State(rules): State<GameRules>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = GameStore::new(pool);
    let mut game = load_owned_game(&store, id, &claims).await?;

    let level = game.current_level;
    let correct_key = game.current_game_question().ok().map(|gq| gq.correct_answer_key());

    let answer_correct = game.answer_current_question(req.letter, &rules, Utc::now())?;

    if game.is_finished() {
        store.finish(&mut game).await?;
        tracing::info!(
            "Game {} finished at level {} with status {:?} and prize {}",
            game.id,
            level,
            game.status(rules.time_limit),
            game.prize
        );
    } else {
        store.save(&mut game).await?;
        tracing::info!("Game {} advanced to level {}", game.id, game.current_level);
    }

    Ok(Json(AnswerResponse {
        game: GameView::new(&game, &rules),
        answer_correct,
        correct_answer_key: if answer_correct { None } else { correct_key },
    }))
}

/// Ends the game and banks the prize of the last level passed.
///
/// Past the time limit the game times out instead and banks its fireproof floor.
pub async fn take_money(
    State(pool): State<SqlitePool>,
    State(rules): State<GameRules>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let store = GameStore::new(pool);
    let mut game = load_owned_game(&store, id, &claims).await?;

    game.take_money(&rules, Utc::now())?;
    let credited = store.finish(&mut game).await?.map_or(0, |p| p.amount);

    tracing::info!(
        "User {} took {} from game {} ({:?})",
        game.user_id,
        credited,
        game.id,
        game.status(rules.time_limit)
    );

    Ok(Json(TakeMoneyResponse {
        game: GameView::new(&game, &rules),
        credited,
    }))
}

/// Uses one of the three helps on the current question.
pub async fn help(
    State(pool): State<SqlitePool>,
    State(rules): State<GameRules>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<HelpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = GameStore::new(pool);
    let mut game = load_owned_game(&store, id, &claims).await?;

    if expire_if_stale(&store, &mut game, &rules).await? {
        tracing::info!("Help {} refused, game {} ran out of time", req.help_type, game.id);
        return Err(GameError::AlreadyFinished.into());
    }

    let mut rng = StdRng::from_entropy();
    game.use_help(req.help_type, &mut rng)?;
    store.save(&mut game).await?;
    tracing::info!("Game {} used {} at level {}", game.id, req.help_type, game.current_level);

    Ok(Json(GameView::new(&game, &rules)))
}
