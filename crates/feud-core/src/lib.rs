//! Feud board - match engine for a host-driven "Family Feud" style game
//!
//! This crate provides the authoritative game state for the board, including:
//! - Team state and scoring
//! - Round content validation (exactly five usable answers per round)
//! - A shuffled question deck that never repeats within a match
//! - The match state machine with full phase rule enforcement
//!
//! # Architecture
//!
//! One host (the conductor) issues [`HostAction`]s; the [`MatchEngine`]
//! validates each one against the current phase and, when it applies,
//! mutates the [`MatchState`] snapshot that every board display renders.
//! The engine is transport-agnostic. It can be compiled to:
//! - Native Rust, driven by the WebSocket server
//! - WebAssembly, for a single-screen local board
//!
//! # Modules
//!
//! - [`team`]: Team identity, names, scores and strikes
//! - [`round`]: Round content and content validation
//! - [`questions`]: Question bank, deck and round supply
//! - [`actions`]: Host actions, payload normalization and match events
//! - [`game`]: Match state machine

pub mod actions;
pub mod game;
pub mod questions;
pub mod round;
pub mod team;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{HostAction, MatchEvent, PayloadError, SoundCue};
pub use game::{
    GamePhase, MatchEngine, MatchError, MatchState, MatchWinner, Steal, DEFAULT_ROUNDS_TOTAL,
    MAX_ROUNDS_TOTAL, MAX_STRIKES, MIN_ROUNDS_TOTAL,
};
pub use questions::{supply, BankError, Deck, QuestionBank, QuestionSource};
pub use round::{Answer, ContentError, Multiplier, RawAnswer, RawRound, RoundContent};
pub use team::{Leader, TeamId, TeamState, Teams};
