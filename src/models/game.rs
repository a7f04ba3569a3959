// src/models/game.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::GameError,
    models::{
        game_question::GameQuestion,
        help::{HelpHash, HelpKind, Letter},
        prize::PrizeTable,
        question::MAX_LEVEL,
    },
};

/// Default time allowed for one game.
pub const TIME_LIMIT_SECS: i64 = 35 * 60;

/// Derived game status. Never stored, see [`Game::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    Won,
    Fail,
    Timeout,
    Money,
}

/// Tunables shared by every game of a running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRules {
    pub prizes: PrizeTable,
    pub time_limit: Duration,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            prizes: PrizeTable::default(),
            time_limit: Duration::seconds(TIME_LIMIT_SECS),
        }
    }
}

/// Amount to credit to a user's balance when a game is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub user_id: i64,
    pub amount: i64,
}

/// One player's play-through.
///
/// `game_questions[level]` is the question asked at `level`. The vector is
/// fixed once the game is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// 0 until persisted.
    pub id: i64,
    pub user_id: i64,
    pub game_questions: Vec<GameQuestion>,
    pub current_level: usize,
    pub is_failed: bool,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub prize: i64,
    pub audience_help_used: bool,
    pub fifty_fifty_used: bool,
    pub friend_call_used: bool,
    /// Optimistic lock counter, bumped by every stored update.
    pub version: i64,
}

impl Game {
    pub fn new(user_id: i64, game_questions: Vec<GameQuestion>, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            user_id,
            game_questions,
            current_level: 0,
            is_failed: false,
            finished_at: None,
            created_at: now,
            prize: 0,
            audience_help_used: false,
            fifty_fifty_used: false,
            friend_call_used: false,
            version: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Status as a guard chain over the stored fields.
    ///
    /// Elapsed time is measured up to `finished_at`, so a finished game keeps
    /// its status forever.
    pub fn status(&self, time_limit: Duration) -> GameStatus {
        derive_status(
            self.finished_at,
            self.created_at,
            self.is_failed,
            self.current_level,
            time_limit,
        )
    }

    pub fn current_game_question(&self) -> Result<&GameQuestion, GameError> {
        self.game_questions
            .get(self.current_level)
            .ok_or(GameError::OutOfRangeLevel {
                level: self.current_level,
            })
    }

    fn current_game_question_mut(&mut self) -> Result<&mut GameQuestion, GameError> {
        let level = self.current_level;
        self.game_questions
            .get_mut(level)
            .ok_or(GameError::OutOfRangeLevel { level })
    }

    /// -1 before the first question has been answered.
    pub fn previous_level(&self) -> i64 {
        self.current_level as i64 - 1
    }

    pub fn previous_game_question(&self) -> Option<&GameQuestion> {
        self.current_level
            .checked_sub(1)
            .and_then(|level| self.game_questions.get(level))
    }

    pub fn is_expired(&self, rules: &GameRules, now: DateTime<Utc>) -> bool {
        now - self.created_at > rules.time_limit
    }

    pub fn help_used(&self, kind: HelpKind) -> bool {
        match kind {
            HelpKind::AudienceHelp => self.audience_help_used,
            HelpKind::FiftyFifty => self.fifty_fifty_used,
            HelpKind::FriendCall => self.friend_call_used,
        }
    }

    /// Answers the current question with `letter`.
    ///
    /// Returns `Ok(true)` if the answer was correct and accepted in time. A wrong
    /// answer or an expired clock finishes the game as failed, with the prize
    /// floored at the last passed fireproof level.
    pub fn answer_current_question(
        &mut self,
        letter: Letter,
        rules: &GameRules,
        now: DateTime<Utc>,
    ) -> Result<bool, GameError> {
        if self.is_finished() {
            return Err(GameError::AlreadyFinished);
        }

        if self.is_expired(rules, now) {
            self.fail(rules, now);
            return Ok(false);
        }

        if !self.current_game_question()?.answer_correct(letter) {
            self.fail(rules, now);
            return Ok(false);
        }

        self.current_level += 1;
        if self.current_level > MAX_LEVEL {
            self.finish(rules.prizes.top_prize(), false, now);
        }
        Ok(true)
    }

    /// Cashes out the prize of the last level passed.
    ///
    /// A game past its time limit times out instead and pays the fireproof
    /// floor; check [`Game::status`] to tell the two apart.
    pub fn take_money(&mut self, rules: &GameRules, now: DateTime<Utc>) -> Result<Payout, GameError> {
        if self.is_finished() {
            return Err(GameError::AlreadyFinished);
        }
        if self.is_expired(rules, now) {
            self.fail(rules, now);
            return Ok(Payout {
                user_id: self.user_id,
                amount: self.prize,
            });
        }
        if self.current_level == 0 {
            return Err(GameError::NothingToCashOut);
        }

        let amount = rules
            .prizes
            .prize_for(self.current_level - 1)
            .ok_or(GameError::OutOfRangeLevel {
                level: self.current_level,
            })?;
        self.finish(amount, false, now);

        Ok(Payout {
            user_id: self.user_id,
            amount,
        })
    }

    /// Finishes a game whose clock ran out. Returns `true` if it did.
    pub fn time_out(&mut self, rules: &GameRules, now: DateTime<Utc>) -> bool {
        if self.is_finished() || !self.is_expired(rules, now) {
            return false;
        }
        self.fail(rules, now);
        true
    }

    /// Uses a help on the current question. Each kind works once per game.
    pub fn use_help<R: Rng + ?Sized>(&mut self, kind: HelpKind, rng: &mut R) -> Result<(), GameError> {
        if self.is_finished() {
            return Err(GameError::AlreadyFinished);
        }
        if self.help_used(kind) {
            return Err(GameError::HelpAlreadyUsed(kind));
        }

        self.current_game_question_mut()?.add_help(kind, rng);
        match kind {
            HelpKind::AudienceHelp => self.audience_help_used = true,
            HelpKind::FiftyFifty => self.fifty_fifty_used = true,
            HelpKind::FriendCall => self.friend_call_used = true,
        }
        Ok(())
    }

    /// What the owner is owed once the game has been finalized.
    pub fn payout(&self) -> Option<Payout> {
        (self.is_finished() && self.prize > 0).then_some(Payout {
            user_id: self.user_id,
            amount: self.prize,
        })
    }

    fn fail(&mut self, rules: &GameRules, now: DateTime<Utc>) {
        let floor = rules.prizes.fireproof_prize(self.current_level);
        self.finish(floor, true, now);
    }

    fn finish(&mut self, prize: i64, failed: bool, now: DateTime<Utc>) {
        self.prize = prize;
        self.is_failed = failed;
        self.finished_at = Some(now);
    }
}

/// Status derived from the stored columns of a game.
pub fn derive_status(
    finished_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    is_failed: bool,
    current_level: usize,
    time_limit: Duration,
) -> GameStatus {
    let Some(finished_at) = finished_at else {
        return GameStatus::InProgress;
    };

    if is_failed && finished_at - created_at > time_limit {
        GameStatus::Timeout
    } else if is_failed {
        GameStatus::Fail
    } else if current_level > MAX_LEVEL {
        GameStatus::Won
    } else {
        GameStatus::Money
    }
}

/// DTO for the question shown to the player. Never carries the correct key.
#[derive(Debug, Serialize)]
pub struct PublicGameQuestion {
    pub level: i64,
    pub text: String,
    /// Options still on the board; fifty-fifty removes two of them.
    pub variants: BTreeMap<Letter, String>,
    pub help_hash: HelpHash,
}

impl From<&GameQuestion> for PublicGameQuestion {
    fn from(gq: &GameQuestion) -> Self {
        let mut variants = gq.variants();
        if let Some(kept) = &gq.help_hash.fifty_fifty {
            variants.retain(|letter, _| kept.contains(letter));
        }
        Self {
            level: gq.level(),
            text: gq.text().to_string(),
            variants,
            help_hash: gq.help_hash.clone(),
        }
    }
}

/// DTO for returning a game to its owner.
#[derive(Debug, Serialize)]
pub struct GameView {
    pub id: i64,
    pub user_id: i64,
    pub status: GameStatus,
    pub current_level: usize,
    pub previous_level: i64,
    pub prize: i64,
    pub finished: bool,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub audience_help_used: bool,
    pub fifty_fifty_used: bool,
    pub friend_call_used: bool,
    pub current_question: Option<PublicGameQuestion>,
}

impl GameView {
    pub fn new(game: &Game, rules: &GameRules) -> Self {
        Self {
            id: game.id,
            user_id: game.user_id,
            status: game.status(rules.time_limit),
            current_level: game.current_level,
            previous_level: game.previous_level(),
            prize: game.prize,
            finished: game.is_finished(),
            created_at: game.created_at,
            finished_at: game.finished_at,
            audience_help_used: game.audience_help_used,
            fifty_fifty_used: game.fifty_fifty_used,
            friend_call_used: game.friend_call_used,
            current_question: game.current_game_question().ok().map(PublicGameQuestion::from),
        }
    }
}

/// One line of a user's game history.
#[derive(Debug, Serialize)]
pub struct GameSummary {
    pub id: i64,
    pub status: GameStatus,
    pub current_level: usize,
    pub prize: i64,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// DTO for answering the current question.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub letter: Letter,
}

/// DTO for requesting a help.
#[derive(Debug, Deserialize)]
pub struct HelpRequest {
    pub help_type: HelpKind,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub game: GameView,
    pub answer_correct: bool,
    /// Revealed only when the answer was wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer_key: Option<Letter>,
}

#[derive(Debug, Serialize)]
pub struct TakeMoneyResponse {
    pub game: GameView,
    pub credited: i64,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{
        game_question::{GameQuestion, KeyShuffle, tests::question},
        prize::PRIZES,
    };
    use chrono::TimeZone;
    use rand::{SeedableRng, rngs::StdRng};

    pub(crate) fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    /// A game whose every question has `b` as the correct letter.
    pub(crate) fn game_with_questions() -> Game {
        let questions = (0..15)
            .map(|level| GameQuestion::new(question(level + 100, level), KeyShuffle::new(2, 1, 4, 3).unwrap()))
            .collect();
        let mut game = Game::new(7, questions, start());
        game.id = 1;
        game
    }

    fn rules() -> GameRules {
        GameRules::default()
    }

    fn later(minutes: i64) -> DateTime<Utc> {
        start() + Duration::minutes(minutes)
    }

    #[test]
    fn new_game_is_in_progress() {
        let game = game_with_questions();
        assert_eq!(game.current_level, 0);
        assert_eq!(game.status(rules().time_limit), GameStatus::InProgress);
        assert_eq!(game.prize, 0);
        assert!(!game.is_finished());
        assert!(!game.audience_help_used && !game.fifty_fifty_used && !game.friend_call_used);
        assert_eq!(game.current_game_question().unwrap(), &game.game_questions[0]);
        assert_eq!(game.previous_level(), -1);
        assert!(game.previous_game_question().is_none());
        assert_eq!(game.payout(), None);
    }

    #[test]
    fn status_guard_chain() {
        let limit = rules().time_limit;
        let mut game = game_with_questions();
        game.finished_at = Some(later(1));
        assert_eq!(game.status(limit), GameStatus::Money);

        game.is_failed = true;
        assert_eq!(game.status(limit), GameStatus::Fail);

        game.finished_at = Some(later(1) + limit);
        assert_eq!(game.status(limit), GameStatus::Timeout);

        let mut won = game_with_questions();
        won.finished_at = Some(later(1));
        won.current_level = MAX_LEVEL + 1;
        assert_eq!(won.status(limit), GameStatus::Won);
    }

    #[test]
    fn correct_answer_continues_game() {
        let mut game = game_with_questions();
        let q = game.current_game_question().unwrap().clone();

        assert_eq!(game.answer_current_question(q.correct_answer_key(), &rules(), later(1)), Ok(true));

        assert_eq!(game.current_level, 1);
        assert_eq!(game.previous_level(), 0);
        assert_eq!(game.previous_game_question(), Some(&q));
        assert_ne!(game.current_game_question().unwrap(), &q);
        assert_eq!(game.status(rules().time_limit), GameStatus::InProgress);
        assert!(!game.is_finished());
    }

    #[test]
    fn wrong_answer_fails_game() {
        let mut game = game_with_questions();

        assert_eq!(game.answer_current_question(Letter::A, &rules(), later(1)), Ok(false));

        assert!(game.is_finished());
        assert_eq!(game.status(rules().time_limit), GameStatus::Fail);
        assert_eq!(game.prize, 0);

        let frozen = game.clone();
        assert_eq!(
            game.answer_current_question(Letter::B, &rules(), later(2)),
            Err(GameError::AlreadyFinished)
        );
        assert_eq!(game.take_money(&rules(), later(2)), Err(GameError::AlreadyFinished));
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            game.use_help(HelpKind::FiftyFifty, &mut rng),
            Err(GameError::AlreadyFinished)
        );
        assert_eq!(game, frozen);
    }

    #[test]
    fn wrong_answer_keeps_fireproof_prize() {
        let mut game = game_with_questions();
        game.current_level = 7;

        assert_eq!(game.answer_current_question(Letter::C, &rules(), later(5)), Ok(false));

        assert_eq!(game.prize, PRIZES[4]);
        assert_eq!(game.payout(), Some(Payout { user_id: 7, amount: PRIZES[4] }));
    }

    #[test]
    fn last_correct_answer_wins() {
        let mut game = game_with_questions();
        game.current_level = MAX_LEVEL;

        assert_eq!(game.answer_current_question(Letter::B, &rules(), later(10)), Ok(true));

        assert!(game.is_finished());
        assert_eq!(game.current_level, 15);
        assert_eq!(game.status(rules().time_limit), GameStatus::Won);
        assert_eq!(game.prize, *PRIZES.iter().max().unwrap());
        assert_eq!(
            game.current_game_question(),
            Err(GameError::OutOfRangeLevel { level: 15 })
        );
    }

    #[test]
    fn full_run_of_correct_answers_wins() {
        let mut game = game_with_questions();
        for minute in 0..15 {
            let key = game.current_game_question().unwrap().correct_answer_key();
            assert_eq!(game.answer_current_question(key, &rules(), later(minute)), Ok(true));
        }
        assert_eq!(game.status(rules().time_limit), GameStatus::Won);
        assert_eq!(game.prize, 1_000_000);
    }

    #[test]
    fn late_answer_times_out_even_if_correct() {
        let mut game = game_with_questions();
        game.current_level = 5;
        let now = start() + rules().time_limit + Duration::seconds(1);

        assert_eq!(game.answer_current_question(Letter::B, &rules(), now), Ok(false));

        assert!(game.is_finished());
        assert_eq!(game.status(rules().time_limit), GameStatus::Timeout);
        assert_eq!(game.current_level, 5);
        assert_eq!(game.prize, PRIZES[4]);
    }

    #[test]
    fn late_take_money_times_out() {
        let mut game = game_with_questions();
        game.current_level = 3;

        let payout = game.take_money(&rules(), later(40)).unwrap();

        assert_eq!(payout, Payout { user_id: 7, amount: 0 });
        assert_eq!(game.status(rules().time_limit), GameStatus::Timeout);
        assert_eq!(game.prize, 0);
        assert_eq!(game.payout(), None);
        assert_eq!(game.take_money(&rules(), later(41)), Err(GameError::AlreadyFinished));
    }

    #[test]
    fn late_take_money_keeps_fireproof_prize() {
        let mut game = game_with_questions();
        game.current_level = 8;

        let payout = game.take_money(&rules(), later(36)).unwrap();

        assert_eq!(payout.amount, PRIZES[4]);
        assert_eq!(game.status(rules().time_limit), GameStatus::Timeout);
        assert_eq!(game.payout(), Some(payout));
    }

    #[test]
    fn late_take_money_at_level_zero_times_out() {
        let mut game = game_with_questions();

        assert_eq!(game.take_money(&rules(), later(36)).map(|p| p.amount), Ok(0));
        assert_eq!(game.status(rules().time_limit), GameStatus::Timeout);
    }

    #[test]
    fn time_out_only_touches_expired_games() {
        let mut game = game_with_questions();
        assert!(!game.time_out(&rules(), later(34)));
        assert!(!game.is_finished());

        assert!(game.time_out(&rules(), later(36)));
        assert_eq!(game.status(rules().time_limit), GameStatus::Timeout);
        assert!(!game.time_out(&rules(), later(40)));
    }

    #[test]
    fn take_money_after_first_answer() {
        let mut game = game_with_questions();
        let key = game.current_game_question().unwrap().correct_answer_key();
        game.answer_current_question(key, &rules(), later(1)).unwrap();

        let payout = game.take_money(&rules(), later(2)).unwrap();

        assert_eq!(game.status(rules().time_limit), GameStatus::Money);
        assert!(game.is_finished());
        assert_eq!(game.prize, PRIZES[0]);
        assert_eq!(payout, Payout { user_id: 7, amount: PRIZES[0] });
        assert_eq!(game.payout(), Some(payout));
    }

    #[test]
    fn take_money_at_level_two() {
        let mut game = game_with_questions();
        game.current_level = 2;

        let payout = game.take_money(&rules(), later(3)).unwrap();

        assert_eq!(payout.amount, PRIZES[1]);
        assert_eq!(game.prize, PRIZES[1]);
        assert_eq!(game.status(rules().time_limit), GameStatus::Money);
    }

    #[test]
    fn take_money_at_level_zero_changes_nothing() {
        let mut game = game_with_questions();
        let before = game.clone();

        assert_eq!(game.take_money(&rules(), later(1)), Err(GameError::NothingToCashOut));
        assert_eq!(game, before);
    }

    #[test]
    fn each_help_works_once() {
        let mut game = game_with_questions();
        let mut rng = StdRng::seed_from_u64(9);

        game.use_help(HelpKind::AudienceHelp, &mut rng).unwrap();
        assert!(game.audience_help_used);
        let help = &game.current_game_question().unwrap().help_hash;
        assert_eq!(help.audience_help.as_ref().map(|h| h.len()), Some(4));

        let before = game.clone();
        assert_eq!(
            game.use_help(HelpKind::AudienceHelp, &mut rng),
            Err(GameError::HelpAlreadyUsed(HelpKind::AudienceHelp))
        );
        assert_eq!(game, before);

        game.use_help(HelpKind::FiftyFifty, &mut rng).unwrap();
        game.use_help(HelpKind::FriendCall, &mut rng).unwrap();
        let help = &game.current_game_question().unwrap().help_hash;
        assert!(help.fifty_fifty.as_ref().unwrap().contains(&Letter::B));
        assert!(help.friend_call.is_some());
        assert!(game.fifty_fifty_used && game.friend_call_used);
        assert!(!game.is_finished());
    }

    #[test]
    fn help_applies_to_current_question_only() {
        let mut game = game_with_questions();
        let mut rng = StdRng::seed_from_u64(4);
        game.answer_current_question(Letter::B, &rules(), later(1)).unwrap();

        game.use_help(HelpKind::FiftyFifty, &mut rng).unwrap();

        assert!(game.game_questions[0].help_hash.is_empty());
        assert!(game.game_questions[1].help_hash.fifty_fifty.is_some());
    }

    #[test]
    fn view_hides_removed_options_and_correct_key() {
        let mut game = game_with_questions();
        let mut rng = StdRng::seed_from_u64(8);
        game.use_help(HelpKind::FiftyFifty, &mut rng).unwrap();

        let view = GameView::new(&game, &rules());
        let question = view.current_question.unwrap();
        assert_eq!(view.status, GameStatus::InProgress);
        assert_eq!(question.variants.len(), 2);
        assert!(question.variants.contains_key(&Letter::B));

        let json = serde_json::to_value(&GameView::new(&game, &rules())).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert!(json.get("correct_answer_key").is_none());
    }

    #[test]
    fn won_game_view_has_no_current_question() {
        let mut game = game_with_questions();
        game.current_level = MAX_LEVEL;
        game.answer_current_question(Letter::B, &rules(), later(1)).unwrap();

        let view = GameView::new(&game, &rules());
        assert!(view.current_question.is_none());
        assert_eq!(view.status, GameStatus::Won);
        assert_eq!(view.previous_level, 14);
    }
}
