//! Question bank and round supply.
//!
//! This module contains:
//! - [`QuestionBank`]: raw rounds loaded from JSON, de-duplicated by question
//! - [`Deck`]: draw-without-replacement over a shuffled order
//! - [`QuestionSource`] and [`supply`]: turning raw candidates into a match's
//!   ordered list of validated rounds

use crate::round::{round_label, Multiplier, RawRound, RoundContent};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum draws from a source while building a round list
pub const SUPPLY_DRAW_BUDGET: usize = 800;

const BUILTIN_BANK: &str = include_str!("builtin_bank.json");

#[derive(Debug, Error)]
pub enum BankError {
    #[error("Failed to read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed question bank: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A collection of raw rounds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionBank {
    rounds: Vec<RawRound>,
}

impl QuestionBank {
    /// Build a bank, dropping blank questions and repeated ones
    pub fn new(raw: Vec<RawRound>) -> Self {
        let mut seen = HashSet::new();
        let rounds = raw
            .into_iter()
            .filter(|r| {
                let key = normalize_question(&r.question);
                !key.is_empty() && seen.insert(key)
            })
            .collect();

        Self { rounds }
    }

    /// Parse a bank from a JSON array of rounds
    pub fn from_json_str(json: &str) -> Result<Self, BankError> {
        let raw: Vec<RawRound> = serde_json::from_str(json)?;
        Ok(Self::new(raw))
    }

    /// Load a bank from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The bank compiled into the crate
    pub fn builtin() -> Self {
        // The embedded file is covered by a unit test
        Self::from_json_str(BUILTIN_BANK).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn rounds(&self) -> &[RawRound] {
        &self.rounds
    }

    /// Turn the bank into a shuffled deck
    pub fn into_deck(self) -> Deck<RawRound> {
        Deck::new(self.rounds)
    }
}

/// Trimmed, lower-cased, inner whitespace collapsed
fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Shuffled draw order over a fixed set of items.
///
/// Items are drawn without replacement; the order is reshuffled only once
/// every item has been drawn.
#[derive(Debug, Clone)]
pub struct Deck<T> {
    items: Vec<T>,
    order: Vec<usize>,
    cursor: usize,
    rng: StdRng,
}

impl<T: Clone> Deck<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self::with_rng(items, StdRng::from_entropy())
    }

    /// Deterministic deck for replays and tests
    pub fn with_seed(items: Vec<T>, seed: u64) -> Self {
        Self::with_rng(items, StdRng::seed_from_u64(seed))
    }

    fn with_rng(items: Vec<T>, rng: StdRng) -> Self {
        let mut deck = Self {
            order: (0..items.len()).collect(),
            items,
            cursor: 0,
            rng,
        };
        deck.reset();
        deck
    }

    /// Draw the next item, reshuffling first if the deck is exhausted
    pub fn next(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        if self.cursor >= self.order.len() {
            debug!(size = self.items.len(), "deck exhausted, reshuffling");
            self.reset();
        }

        let item = self.items[self.order[self.cursor]].clone();
        self.cursor += 1;
        Some(item)
    }

    /// Reshuffle and start over
    pub fn reset(&mut self) {
        self.order.shuffle(&mut self.rng);
        self.cursor = 0;
    }

    /// Items left before the next reshuffle
    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Provider of candidate round content
pub trait QuestionSource {
    /// Draw one candidate, `None` when the source has nothing at all
    fn draw(&mut self) -> Option<RawRound>;
}

impl QuestionSource for Deck<RawRound> {
    fn draw(&mut self) -> Option<RawRound> {
        self.next()
    }
}

/// Build a match's ordered list of up to `count` validated rounds.
///
/// Invalid candidates and questions already in the list are skipped, so a
/// match never repeats a question as long as the source holds at least
/// `count` distinct valid ones. Drawing stops after
/// [`SUPPLY_DRAW_BUDGET`] attempts, so the result can be shorter than
/// requested. Rounds are labelled and given multipliers by position.
pub fn supply<S: QuestionSource + ?Sized>(source: &mut S, count: usize) -> Vec<RoundContent> {
    let mut rounds = Vec::with_capacity(count);
    let mut seen = HashSet::new();
    let mut draws = 0;

    while rounds.len() < count && draws < SUPPLY_DRAW_BUDGET {
        draws += 1;
        let Some(candidate) = source.draw() else {
            break;
        };
        match RoundContent::validate(&candidate) {
            Ok(round) => {
                if seen.insert(normalize_question(&round.question)) {
                    rounds.push(round);
                }
            }
            Err(e) => debug!(question = %candidate.question, "skipping question: {}", e),
        }
    }

    if rounds.len() < count {
        warn!(
            requested = count,
            obtained = rounds.len(),
            "could not supply enough distinct valid rounds, every question needs 5 answers with points > 0"
        );
    }

    for (i, round) in rounds.iter_mut().enumerate() {
        round.label = round_label(i);
        round.multiplier = Multiplier::for_position(i);
    }

    rounds
}
