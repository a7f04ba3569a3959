// src/models/help.rs

use std::collections::BTreeMap;
use std::fmt;

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

/// Presentation letter of an answer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    pub const ALL: [Letter; 4] = [Letter::A, Letter::B, Letter::C, Letter::D];

    pub fn as_str(self) -> &'static str {
        match self {
            Letter::A => "a",
            Letter::B => "b",
            Letter::C => "c",
            Letter::D => "d",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Letter::A => 0,
            Letter::B => 1,
            Letter::C => 2,
            Letter::D => 3,
        }
    }

    /// All letters except `self`, in alphabetical order.
    pub fn others(self) -> Vec<Letter> {
        Letter::ALL.into_iter().filter(|&l| l != self).collect()
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one-time assists a player can use during a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelpKind {
    AudienceHelp,
    FiftyFifty,
    FriendCall,
}

impl fmt::Display for HelpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HelpKind::AudienceHelp => "audience_help",
            HelpKind::FiftyFifty => "fifty_fifty",
            HelpKind::FriendCall => "friend_call",
        })
    }
}

/// Data produced by the helps used on one question.
///
/// Entries are only ever added. Serialized as a JSON object keyed by help kind,
/// absent helps are omitted:
///
/// ```json
/// { "fifty_fifty": ["a", "b"], "audience_help": {"a": 42, "b": 37, "c": 12, "d": 9} }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpHash {
    /// Vote share (percent) per letter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_help: Option<BTreeMap<Letter, u32>>,

    /// The two letters left after removing two wrong ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifty_fifty: Option<Vec<Letter>>,

    /// What the friend said on the phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friend_call: Option<String>,
}

impl HelpHash {
    pub fn is_empty(&self) -> bool {
        self.audience_help.is_none() && self.fifty_fifty.is_none() && self.friend_call.is_none()
    }

    pub fn contains(&self, kind: HelpKind) -> bool {
        match kind {
            HelpKind::AudienceHelp => self.audience_help.is_some(),
            HelpKind::FiftyFifty => self.fifty_fifty.is_some(),
            HelpKind::FriendCall => self.friend_call.is_some(),
        }
    }
}

const FRIENDS: [&str; 6] = [
    "Uncle Vasily",
    "Aunt Masha",
    "Professor Hale",
    "Grandma Rose",
    "Your neighbour Ivan",
    "Coach Dmitri",
];

/// Audience vote shares summing to 100.
///
/// The correct letter always gets a strict plurality (51..=85 percent). The
/// remainder is split randomly over the wrong letters.
pub fn audience_distribution<R: Rng + ?Sized>(rng: &mut R, correct: Letter) -> BTreeMap<Letter, u32> {
    let correct_share: u32 = rng.gen_range(51..=85);
    let mut rest = 100 - correct_share;

    let mut wrong = correct.others();
    wrong.shuffle(rng);

    let mut shares = BTreeMap::new();
    shares.insert(correct, correct_share);
    for (i, letter) in wrong.iter().enumerate() {
        let share = if i + 1 == wrong.len() {
            rest
        } else {
            rng.gen_range(0..=rest)
        };
        rest -= share;
        shares.insert(*letter, share);
    }
    shares
}

/// The correct letter plus one uniformly chosen wrong letter, sorted.
pub fn fifty_fifty<R: Rng + ?Sized>(rng: &mut R, correct: Letter) -> Vec<Letter> {
    let wrong = correct.others();
    let kept = *wrong.choose(rng).unwrap_or(&wrong[0]);
    let mut letters = vec![correct, kept];
    letters.sort();
    letters
}

/// A friend names the correct letter 80% of the time, a random wrong one otherwise.
pub fn friend_call<R: Rng + ?Sized>(rng: &mut R, correct: Letter) -> String {
    let friend = FRIENDS.choose(rng).copied().unwrap_or(FRIENDS[0]);
    let guess = if rng.gen_bool(0.8) {
        correct
    } else {
        let wrong = correct.others();
        *wrong.choose(rng).unwrap_or(&wrong[0])
    };
    format!(
        "{} thinks the answer is {}",
        friend,
        guess.as_str().to_ascii_uppercase()
    )
}
