//! Round content and content validation.
//!
//! Question sources deliver [`RawRound`]s, which are untrusted: answers may be
//! blank, carry zero or non-finite points, or repeat each other. Only rounds
//! that validate into a [`RoundContent`] with exactly five answers are ever
//! installed on the board.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Number of answers every playable round carries
pub const ANSWERS_PER_ROUND: usize = 5;

/// Point multiplier for a round (1x, 2x or 3x)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Multiplier(u8);

impl Multiplier {
    pub const SINGLE: Multiplier = Multiplier(1);
    pub const DOUBLE: Multiplier = Multiplier(2);
    pub const TRIPLE: Multiplier = Multiplier(3);

    pub fn value(self) -> u8 {
        self.0
    }

    /// Multiplier by position in the match: the first five rounds are 1x,
    /// the next three 2x, everything after that 3x.
    pub fn for_position(index: usize) -> Multiplier {
        match index {
            0..=4 => Multiplier::SINGLE,
            5..=7 => Multiplier::DOUBLE,
            _ => Multiplier::TRIPLE,
        }
    }

    /// Apply the multiplier to a base point value, saturating at `i64::MAX`
    pub fn apply(self, base: u64) -> i64 {
        i64::try_from(base)
            .unwrap_or(i64::MAX)
            .saturating_mul(i64::from(self.0))
    }
}

impl TryFrom<u8> for Multiplier {
    type Error = ContentError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=3 => Ok(Multiplier(value)),
            other => Err(ContentError::InvalidMultiplier(f64::from(other))),
        }
    }
}

impl From<Multiplier> for u8 {
    fn from(m: Multiplier) -> u8 {
        m.0
    }
}

/// Why a candidate round was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentError {
    #[error("Question text is empty")]
    EmptyQuestion,

    #[error("Invalid multiplier {0}, must be 1, 2 or 3")]
    InvalidMultiplier(f64),

    #[error("Round has {0} usable answers, needs exactly 5")]
    WrongAnswerCount(usize),
}

/// An answer as delivered by a question source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnswer {
    #[serde(default)]
    pub text: String,
    /// Kept as a float so fractional, zero and non-finite values can be rejected
    #[serde(default)]
    pub points: f64,
}

impl RawAnswer {
    pub fn new(text: impl Into<String>, points: f64) -> Self {
        Self {
            text: text.into(),
            points,
        }
    }
}

/// A round as delivered by a question source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRound {
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_raw_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answers: Vec<RawAnswer>,
}

fn default_raw_multiplier() -> f64 {
    1.0
}

/// A single answer on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// Base points, before the round multiplier
    pub points: u32,
    pub revealed: bool,
}

impl Answer {
    /// Whether revealing this answer can credit points
    pub fn is_playable(&self) -> bool {
        !self.text.trim().is_empty() && self.points > 0
    }
}

/// Content of the round currently on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundContent {
    pub label: String,
    pub multiplier: Multiplier,
    pub question: String,
    pub answers: Vec<Answer>,
}

impl RoundContent {
    /// Validate a raw candidate into a playable round.
    pub fn validate(raw: &RawRound) -> Result<RoundContent, ContentError> {
        let question = raw.question.trim();
        if question.is_empty() {
            return Err(ContentError::EmptyQuestion);
        }

        let multiplier = parse_multiplier(raw.multiplier)?;

        let answers = normalize_answers(&raw.answers);
        if answers.len() != ANSWERS_PER_ROUND {
            return Err(ContentError::WrongAnswerCount(answers.len()));
        }

        Ok(RoundContent {
            label: raw.label.clone(),
            multiplier,
            question: question.to_string(),
            answers,
        })
    }

    /// Degenerate round used when no valid content exists for an index
    pub fn placeholder(index: usize) -> RoundContent {
        RoundContent {
            label: round_label(index),
            multiplier: Multiplier::SINGLE,
            question: "No valid questions".to_string(),
            answers: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn revealed_count(&self) -> usize {
        self.answers.iter().filter(|a| a.revealed).count()
    }

    pub fn any_revealed(&self) -> bool {
        self.answers.iter().any(|a| a.revealed)
    }

    pub fn set_all_revealed(&mut self, revealed: bool) {
        for answer in &mut self.answers {
            answer.revealed = revealed;
        }
    }
}

/// Positional label for a round ("Round 1", "Round 2", ...)
pub fn round_label(index: usize) -> String {
    format!("Round {}", index + 1)
}

fn parse_multiplier(value: f64) -> Result<Multiplier, ContentError> {
    if value.fract() != 0.0 || !(1.0..=3.0).contains(&value) {
        return Err(ContentError::InvalidMultiplier(value));
    }
    Multiplier::try_from(value as u8)
}

/// Clean up raw answers.
///
/// Drops blank text and non-finite, fractional or non-positive points,
/// removes case-insensitive duplicates (first one wins) and keeps at most
/// five, in source order.
pub fn normalize_answers(raw: &[RawAnswer]) -> Vec<Answer> {
    let mut seen = HashSet::new();

    raw.iter()
        .filter_map(|a| {
            let text = a.text.trim();
            let points = a.points;
            if text.is_empty()
                || !points.is_finite()
                || points <= 0.0
                || points.fract() != 0.0
                || points > f64::from(u32::MAX)
            {
                return None;
            }
            Some((text, points as u32))
        })
        .filter(|(text, _)| seen.insert(text.to_lowercase()))
        .take(ANSWERS_PER_ROUND)
        .map(|(text, points)| Answer {
            text: text.to_string(),
            points,
            revealed: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(question: &str, multiplier: f64, answers: &[(&str, f64)]) -> RawRound {
        RawRound {
            label: "Bank".to_string(),
            multiplier,
            question: question.to_string(),
            answers: answers.iter().map(|(t, p)| RawAnswer::new(*t, *p)).collect(),
        }
    }

    const FIVE: [(&str, f64); 5] = [
        ("Agua", 40.0),
        ("Leche", 25.0),
        ("Jugo", 15.0),
        ("Refresco", 12.0),
        ("Cafe", 8.0),
    ];

    #[test]
    fn test_valid_round() {
        let round = RoundContent::validate(&raw("  Something to drink?  ", 2.0, &FIVE)).unwrap();
        assert_eq!(round.question, "Something to drink?");
        assert_eq!(round.multiplier, Multiplier::DOUBLE);
        assert_eq!(round.answers.len(), 5);
        assert!(round.answers.iter().all(|a| !a.revealed && a.points > 0));
    }

    #[test]
    fn test_empty_question_rejected() {
        assert_eq!(
            RoundContent::validate(&raw("   ", 1.0, &FIVE)),
            Err(ContentError::EmptyQuestion)
        );
    }

    #[test]
    fn test_bad_multiplier_rejected() {
        for m in [0.0, 4.0, 1.5, f64::NAN] {
            assert!(matches!(
                RoundContent::validate(&raw("Q", m, &FIVE)),
                Err(ContentError::InvalidMultiplier(_))
            ));
        }
    }

    #[test]
    fn test_unusable_answers_dropped() {
        let answers = [
            ("Agua", 40.0),
            ("", 30.0),
            ("Leche", 0.0),
            ("Jugo", -5.0),
            ("Te", f64::INFINITY),
            ("Cafe", 10.0),
        ];
        let cleaned = normalize_answers(
            &answers.iter().map(|(t, p)| RawAnswer::new(*t, *p)).collect::<Vec<_>>(),
        );
        let texts: Vec<_> = cleaned.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec!["Agua", "Cafe"]);

        assert_eq!(
            RoundContent::validate(&raw("Q", 1.0, &answers)),
            Err(ContentError::WrongAnswerCount(2))
        );
    }

    #[test]
    fn test_duplicates_removed_case_insensitively() {
        let answers = [
            ("Agua", 40.0),
            (" agua ", 30.0),
            ("Leche", 20.0),
            ("Jugo", 15.0),
            ("Refresco", 10.0),
        ];
        assert_eq!(
            RoundContent::validate(&raw("Q", 1.0, &answers)),
            Err(ContentError::WrongAnswerCount(4))
        );
    }

    #[test]
    fn test_extra_answers_truncated_to_five() {
        let mut answers = FIVE.to_vec();
        answers.push(("Vino", 3.0));
        let round = RoundContent::validate(&raw("Q", 1.0, &answers)).unwrap();
        assert_eq!(round.answers.len(), 5);
        assert_eq!(round.answers[4].text, "Cafe");
    }

    #[test]
    fn test_multiplier_by_position() {
        let tiers: Vec<u8> = (0..10).map(|i| Multiplier::for_position(i).value()).collect();
        assert_eq!(tiers, vec![1, 1, 1, 1, 1, 2, 2, 2, 3, 3]);
    }

    #[test]
    fn test_multiplier_apply() {
        let five_max = 5 * u64::from(u32::MAX);
        assert_eq!(Multiplier::TRIPLE.apply(five_max), 3 * five_max as i64);
        assert_eq!(Multiplier::DOUBLE.apply(u64::MAX), i64::MAX);
    }

    #[test]
    fn test_placeholder() {
        let round = RoundContent::placeholder(2);
        assert_eq!(round.label, "Round 3");
        assert!(round.is_placeholder());
        assert_eq!(round.multiplier, Multiplier::SINGLE);
    }

    #[test]
    fn test_multiplier_wire_format() {
        assert_eq!(serde_json::to_string(&Multiplier::TRIPLE).unwrap(), "3");
        assert!(serde_json::from_str::<Multiplier>("4").is_err());
    }
}
