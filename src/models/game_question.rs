// src/models/game_question.rs

use std::collections::BTreeMap;

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::models::{
    help::{self, HelpHash, HelpKind, Letter},
    question::Question,
};

/// Maps each presentation letter to an original answer slot (1..=4).
///
/// Generated once when the game is built and stored with the game question,
/// so the correct letter never moves when helps hide options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShuffle {
    slots: [u8; 4],
}

impl KeyShuffle {
    /// Builds a shuffle from the slots behind `a`, `b`, `c` and `d`.
    /// Returns `None` unless the slots are a permutation of 1..=4.
    pub fn new(a: u8, b: u8, c: u8, d: u8) -> Option<Self> {
        let slots = [a, b, c, d];
        let mut sorted = slots;
        sorted.sort_unstable();
        (sorted == [1, 2, 3, 4]).then_some(Self { slots })
    }

    /// Uniform over all 24 permutations.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut slots = [1, 2, 3, 4];
        slots.shuffle(rng);
        Self { slots }
    }

    pub fn slot(&self, letter: Letter) -> u8 {
        self.slots[letter.index()]
    }

    pub fn slots(&self) -> [u8; 4] {
        self.slots
    }

    fn letter_for_slot(&self, slot: u8) -> Letter {
        Letter::ALL
            .into_iter()
            .find(|&l| self.slot(l) == slot)
            .unwrap_or(Letter::A)
    }
}

/// One question instance bound to a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameQuestion {
    /// 0 until persisted.
    pub id: i64,
    pub game_id: i64,
    pub question: Question,
    pub key_shuffle: KeyShuffle,
    pub help_hash: HelpHash,
}

impl GameQuestion {
    pub fn new(question: Question, key_shuffle: KeyShuffle) -> Self {
        Self {
            id: 0,
            game_id: 0,
            question,
            key_shuffle,
            help_hash: HelpHash::default(),
        }
    }

    pub fn level(&self) -> i64 {
        self.question.level
    }

    pub fn text(&self) -> &str {
        &self.question.text
    }

    /// Answer texts keyed by presentation letter.
    pub fn variants(&self) -> BTreeMap<Letter, String> {
        Letter::ALL
            .into_iter()
            .map(|letter| {
                let text = self
                    .question
                    .answer(self.key_shuffle.slot(letter))
                    .unwrap_or_default();
                (letter, text.to_string())
            })
            .collect()
    }

    /// The letter hiding the original slot 1.
    pub fn correct_answer_key(&self) -> Letter {
        self.key_shuffle.letter_for_slot(1)
    }

    pub fn answer_correct(&self, letter: Letter) -> bool {
        letter == self.correct_answer_key()
    }

    pub fn add_audience_help<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.help_hash.contains(HelpKind::AudienceHelp) {
            let correct = self.correct_answer_key();
            self.help_hash.audience_help = Some(help::audience_distribution(rng, correct));
        }
    }

    pub fn add_fifty_fifty<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.help_hash.contains(HelpKind::FiftyFifty) {
            let correct = self.correct_answer_key();
            self.help_hash.fifty_fifty = Some(help::fifty_fifty(rng, correct));
        }
    }

    pub fn add_friend_call<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.help_hash.contains(HelpKind::FriendCall) {
            let correct = self.correct_answer_key();
            self.help_hash.friend_call = Some(help::friend_call(rng, correct));
        }
    }

    pub fn add_help<R: Rng + ?Sized>(&mut self, kind: HelpKind, rng: &mut R) {
        match kind {
            HelpKind::AudienceHelp => self.add_audience_help(rng),
            HelpKind::FiftyFifty => self.add_fifty_fifty(rng),
            HelpKind::FriendCall => self.add_friend_call(rng),
        }
    }
}
