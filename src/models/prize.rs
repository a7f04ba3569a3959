// src/models/prize.rs

use thiserror::Error;

use crate::models::question::QUESTIONS_PER_GAME;

/// Default prize ladder, indexed by level.
pub const PRIZES: [i64; QUESTIONS_PER_GAME] = [
    100, 200, 300, 500, 1_000, 2_000, 4_000, 8_000, 16_000, 32_000, 64_000, 125_000, 250_000,
    500_000, 1_000_000,
];

/// Levels whose prize is kept even if the player fails later on.
pub const FIREPROOF_LEVELS: [usize; 3] = [4, 9, 14];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrizeTableError {
    #[error("prize table must have {expected} entries, got {got}")]
    WrongLength { expected: usize, got: usize },
    #[error("prize at level {level} must be positive and greater than the previous one")]
    NotIncreasing { level: usize },
    #[error("fireproof level {level} is out of range (max {max})")]
    FireproofOutOfRange { level: usize, max: usize },
}

/// Fixed schedule mapping level -> prize amount, plus the fireproof levels.
///
/// `amounts[level]` is what the player banks once the question at `level`
/// has been answered correctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrizeTable {
    amounts: Vec<i64>,
    fireproof_levels: Vec<usize>,
}

impl PrizeTable {
    pub fn new(amounts: Vec<i64>, mut fireproof_levels: Vec<usize>) -> Result<Self, PrizeTableError> {
        if amounts.len() != QUESTIONS_PER_GAME {
            return Err(PrizeTableError::WrongLength {
                expected: QUESTIONS_PER_GAME,
                got: amounts.len(),
            });
        }

        let mut previous = 0;
        for (level, &amount) in amounts.iter().enumerate() {
            if amount <= previous {
                return Err(PrizeTableError::NotIncreasing { level });
            }
            previous = amount;
        }

        fireproof_levels.sort_unstable();
        fireproof_levels.dedup();
        if let Some(&level) = fireproof_levels.iter().find(|&&l| l >= QUESTIONS_PER_GAME) {
            return Err(PrizeTableError::FireproofOutOfRange {
                level,
                max: QUESTIONS_PER_GAME - 1,
            });
        }

        Ok(Self {
            amounts,
            fireproof_levels,
        })
    }

    pub fn fireproof_levels(&self) -> &[usize] {
        &self.fireproof_levels
    }

    pub fn prize_for(&self, level: usize) -> Option<i64> {
        self.amounts.get(level).copied()
    }

    pub fn top_prize(&self) -> i64 {
        self.amounts.last().copied().unwrap_or(0)
    }

    /// Prize kept when a game at `current_level` ends in failure.
    ///
    /// Only levels already passed count, i.e. fireproof levels `<= current_level - 1`.
    pub fn fireproof_prize(&self, current_level: usize) -> i64 {
        self.fireproof_levels
            .iter()
            .rev()
            .find(|&&level| level < current_level)
            .and_then(|&level| self.prize_for(level))
            .unwrap_or(0)
    }
}

impl Default for PrizeTable {
    fn default() -> Self {
        Self {
            amounts: PRIZES.to_vec(),
            fireproof_levels: FIREPROOF_LEVELS.to_vec(),
        }
    }
}
