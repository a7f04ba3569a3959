// src/config.rs

use std::env;
use std::str::FromStr;

use chrono::Duration;
use dotenvy::dotenv;
use thiserror::Error;

use crate::models::{
    game::{GameRules, TIME_LIMIT_SECS},
    prize::{FIREPROOF_LEVELS, PRIZES, PrizeTable, PrizeTableError},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error(transparent)]
    PrizeTable(#[from] PrizeTableError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub game_time_limit_secs: i64,
    pub prizes: Vec<i64>,
    pub fireproof_levels: Vec<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;

        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = parsed("JWT_EXPIRATION")?.unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let game_time_limit_secs = parsed("GAME_TIME_LIMIT_SECS")?.unwrap_or(TIME_LIMIT_SECS);
        if game_time_limit_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: "GAME_TIME_LIMIT_SECS",
                reason: "must be positive".to_string(),
            });
        }

        let config = Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            game_time_limit_secs,
            prizes: list("PRIZE_TABLE")?.unwrap_or_else(|| PRIZES.to_vec()),
            fireproof_levels: list("FIREPROOF_LEVELS")?.unwrap_or_else(|| FIREPROOF_LEVELS.to_vec()),
        };

        // Validates the prize table and fireproof levels.
        config.game_rules()?;

        Ok(config)
    }

    /// Builds the rules every game of this server is played by.
    pub fn game_rules(&self) -> Result<GameRules, ConfigError> {
        Ok(GameRules {
            prizes: PrizeTable::new(self.prizes.clone(), self.fireproof_levels.clone())?,
            time_limit: Duration::seconds(self.game_time_limit_secs),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn list<T: FromStr>(name: &'static str) -> Result<Option<Vec<T>>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => parse_list(&raw)
            .map(Some)
            .map_err(|reason| ConfigError::Invalid { name, reason }),
        Err(_) => Ok(None),
    }
}

fn parse_list<T: FromStr>(raw: &str) -> Result<Vec<T>, String>
where
    T::Err: std::fmt::Display,
{
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse().map_err(|e: T::Err| format!("'{}': {}", item, e)))
        .collect()
}
