// src/services/mod.rs

pub mod game_factory;
pub mod game_store;
pub mod question_bank;
