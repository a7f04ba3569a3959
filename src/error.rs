// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::models::help::HelpKind;

/// Domain errors raised by the game state machine and the game factory.
///
/// Failing operations leave the game untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("no question available for level {level}")]
    InsufficientQuestions { level: usize },

    #[error("game is already finished")]
    AlreadyFinished,

    #[error("level {level} has no question")]
    OutOfRangeLevel { level: usize },

    #[error("{0} has already been used in this game")]
    HelpAlreadyUsed(HelpKind),

    #[error("answer at least one question before taking the money")]
    NothingToCashOut,
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (e.g., somebody else's game)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username, game already running)
    Conflict(String),

    // 503 Service Unavailable (e.g., question bank too small)
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Maps game rule violations to HTTP semantics.
///
/// Contract violations (acting on a finished game) are conflicts with the
/// stored state; rejected player moves are bad requests.
impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        let msg = err.to_string();
        match err {
            GameError::InsufficientQuestions { .. } => AppError::ServiceUnavailable(msg),
            GameError::AlreadyFinished | GameError::OutOfRangeLevel { .. } => AppError::Conflict(msg),
            GameError::HelpAlreadyUsed(_) | GameError::NothingToCashOut => AppError::BadRequest(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_errors_map_to_status_codes() {
        let cases = [
            (GameError::InsufficientQuestions { level: 3 }, StatusCode::SERVICE_UNAVAILABLE),
            (GameError::AlreadyFinished, StatusCode::CONFLICT),
            (GameError::OutOfRangeLevel { level: 15 }, StatusCode::CONFLICT),
            (GameError::HelpAlreadyUsed(HelpKind::FiftyFifty), StatusCode::BAD_REQUEST),
            (GameError::NothingToCashOut, StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn help_error_names_the_help() {
        assert_eq!(
            GameError::HelpAlreadyUsed(HelpKind::AudienceHelp).to_string(),
            "audience_help has already been used in this game"
        );
    }
}
