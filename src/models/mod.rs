// src/models/mod.rs

pub mod game;
pub mod game_question;
pub mod help;
pub mod prize;
pub mod question;
pub mod user;
