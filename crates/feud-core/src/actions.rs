//! Host actions and the events they produce.
//!
//! This module defines every action the host (conductor) can issue, the
//! normalization step that turns an untyped JSON payload into a
//! [`HostAction`], and the events that describe what an applied action
//! changed.

use crate::game::{MatchWinner, DEFAULT_ROUNDS_TOTAL};
use crate::team::TeamId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// All possible actions the host can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostAction {
    // ==================== Setup ====================
    /// Name both teams (setup), or seat a challenger after a match
    #[serde(rename_all = "camelCase")]
    SetTeams { team_a: String, team_b: String },
    /// Choose how many rounds the next match lasts
    #[serde(rename_all = "camelCase")]
    SetRoundsTotal { rounds_total: u32 },
    /// Leave setup and play the first round
    StartMatch,

    // ==================== Round Play ====================
    /// Hand the turn to a team
    SetTurnTeam { team: TeamId },
    /// Uncover one answer
    Reveal { index: usize },
    /// Cover one answer again
    Hide { index: usize },
    /// Uncover every answer, never scores
    RevealAll,
    /// Cover every answer, never scores
    HideAll,
    /// Mark a wrong guess for the team in turn
    StrikeAdd,
    /// Always rejected, strikes only clear on round reset
    StrikeClear,
    /// Settle the steal attempt
    StealResolve { success: bool },
    /// Move on to the next round, or finish the match
    NextRound,

    // ==================== Match End ====================
    /// Always rejected, challengers are seated through `SetTeams`
    #[serde(rename_all = "camelCase")]
    ChallengerYes {
        #[serde(default)]
        challenger_name: String,
    },
    /// No challenger: go back to setup
    ChallengerNo,
    /// Throw everything away and start from scratch
    ResetAll,
}

impl HostAction {
    /// Wire name of the action
    pub fn kind(&self) -> &'static str {
        match self {
            HostAction::SetTeams { .. } => "SET_TEAMS",
            HostAction::SetRoundsTotal { .. } => "SET_ROUNDS_TOTAL",
            HostAction::StartMatch => "START_MATCH",
            HostAction::SetTurnTeam { .. } => "SET_TURN_TEAM",
            HostAction::Reveal { .. } => "REVEAL",
            HostAction::Hide { .. } => "HIDE",
            HostAction::RevealAll => "REVEAL_ALL",
            HostAction::HideAll => "HIDE_ALL",
            HostAction::StrikeAdd => "STRIKE_ADD",
            HostAction::StrikeClear => "STRIKE_CLEAR",
            HostAction::StealResolve { .. } => "STEAL_RESOLVE",
            HostAction::NextRound => "NEXT_ROUND",
            HostAction::ChallengerYes { .. } => "CHALLENGER_YES",
            HostAction::ChallengerNo => "CHALLENGER_NO",
            HostAction::ResetAll => "RESET_ALL",
        }
    }

    /// Normalize an untyped payload into a well-typed action.
    ///
    /// Hosts built against the loose wire format send numbers as strings,
    /// omit fields and pad names with whitespace. All coercion happens here
    /// so the engine only ever sees clean values.
    pub fn from_value(value: Value) -> Result<HostAction, PayloadError> {
        let Value::Object(fields) = value else {
            return Err(PayloadError::NotAnObject);
        };
        let kind = match fields.get("type") {
            Some(Value::String(kind)) => kind.as_str(),
            _ => return Err(PayloadError::MissingType),
        };

        let action = match kind {
            "SET_TEAMS" => HostAction::SetTeams {
                team_a: text_field(&fields, "teamA"),
                team_b: text_field(&fields, "teamB"),
            },
            "SET_ROUNDS_TOTAL" => HostAction::SetRoundsTotal {
                rounds_total: rounds_total_field(&fields)?,
            },
            "START_MATCH" => HostAction::StartMatch,
            "SET_TURN_TEAM" => HostAction::SetTurnTeam {
                team: team_field(&fields, "team")?,
            },
            "REVEAL" => HostAction::Reveal {
                index: index_field(&fields, "index")?,
            },
            "HIDE" => HostAction::Hide {
                index: index_field(&fields, "index")?,
            },
            "REVEAL_ALL" => HostAction::RevealAll,
            "HIDE_ALL" => HostAction::HideAll,
            "STRIKE_ADD" => HostAction::StrikeAdd,
            "STRIKE_CLEAR" => HostAction::StrikeClear,
            "STEAL_RESOLVE" => HostAction::StealResolve {
                success: bool_field(&fields, "success")?,
            },
            "NEXT_ROUND" => HostAction::NextRound,
            "CHALLENGER_YES" => HostAction::ChallengerYes {
                challenger_name: text_field(&fields, "challengerName"),
            },
            "CHALLENGER_NO" => HostAction::ChallengerNo,
            "RESET_ALL" => HostAction::ResetAll,
            other => return Err(PayloadError::UnknownType(other.to_string())),
        };

        Ok(action)
    }
}

/// Errors produced while normalizing an action payload
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PayloadError {
    #[error("Action payload must be a JSON object")]
    NotAnObject,

    #[error("Action payload has no type")]
    MissingType,

    #[error("Unknown action type: {0}")]
    UnknownType(String),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

impl PayloadError {
    fn invalid(field: &str, reason: &str) -> Self {
        PayloadError::InvalidField {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Trimmed string, non-strings read as empty
fn text_field(fields: &Map<String, Value>, name: &str) -> String {
    match fields.get(name) {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

/// Integral number, or a string holding one
fn number_field(fields: &Map<String, Value>, name: &str) -> Result<Option<f64>, PayloadError> {
    let n = match fields.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match n {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(PayloadError::invalid(name, "not a number")),
    }
}

fn rounds_total_field(fields: &Map<String, Value>) -> Result<u32, PayloadError> {
    match number_field(fields, "roundsTotal")? {
        // A missing or zero count means "use the default"
        None => Ok(DEFAULT_ROUNDS_TOTAL),
        Some(n) if n == 0.0 => Ok(DEFAULT_ROUNDS_TOTAL),
        // The engine clamps, so only the sign matters here
        Some(n) if n < 0.0 => Ok(0),
        Some(n) => Ok(n.floor().min(f64::from(u32::MAX)) as u32),
    }
}

fn index_field(fields: &Map<String, Value>, name: &str) -> Result<usize, PayloadError> {
    match number_field(fields, name)? {
        None => Err(PayloadError::invalid(name, "missing")),
        Some(n) if n < 0.0 || n.fract() != 0.0 => {
            Err(PayloadError::invalid(name, "not a non-negative integer"))
        }
        Some(n) => Ok(n as usize),
    }
}

fn team_field(fields: &Map<String, Value>, name: &str) -> Result<TeamId, PayloadError> {
    match fields.get(name) {
        Some(Value::String(s)) => {
            TeamId::parse(s.trim()).ok_or_else(|| PayloadError::invalid(name, "unknown team"))
        }
        _ => Err(PayloadError::invalid(name, "missing")),
    }
}

fn bool_field(fields: &Map<String, Value>, name: &str) -> Result<bool, PayloadError> {
    match fields.get(name) {
        Some(Value::Bool(b)) => Ok(*b),
        _ => Err(PayloadError::invalid(name, "not a boolean")),
    }
}

/// Audio cue a display plays in response to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    Intro,
    Correct,
    Wrong,
    Round,
    Triumph,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchEvent {
    /// Team names changed
    TeamsNamed { team_a: String, team_b: String },

    /// A challenger took the losing team's seat
    ChallengerSeated { winner: TeamId, challenger: String },

    /// The match length changed
    RoundsTotalChanged { rounds_total: u32 },

    /// The match began
    MatchStarted { rounds_total: u32 },

    /// A round was installed on the board
    RoundStarted { round: u32, multiplier: u8 },

    /// The turn moved
    TurnChanged { team: TeamId },

    /// An answer was uncovered; `scored` is zero for display-only reveals
    AnswerRevealed { index: usize, scored: i64 },

    /// An answer was covered again; `refunded` is zero when nothing was scored
    AnswerHidden { index: usize, refunded: i64 },

    /// Every answer was uncovered
    AllRevealed,

    /// Every answer was covered
    AllHidden,

    /// A wrong guess was marked
    StrikeAdded { team: TeamId, strikes: u8 },

    /// The team in turn struck out
    StealOpened { defender: TeamId, stealer: TeamId },

    /// The steal attempt was settled
    StealResolved {
        success: bool,
        stealer: TeamId,
        transferred: i64,
    },

    /// The last round is over
    MatchFinished { winner: MatchWinner },

    /// Back to setup after a finished match
    ReturnedToSetup,

    /// Everything was reset
    MatchReset,
}

impl MatchEvent {
    /// Sound a display should play for this event, if any
    pub fn sound_cue(&self) -> Option<SoundCue> {
        match self {
            MatchEvent::MatchStarted { .. } | MatchEvent::MatchReset => Some(SoundCue::Intro),
            MatchEvent::AnswerRevealed { .. } => Some(SoundCue::Correct),
            MatchEvent::StrikeAdded { .. } => Some(SoundCue::Wrong),
            MatchEvent::StealResolved { success: true, .. } => Some(SoundCue::Correct),
            MatchEvent::StealResolved { success: false, .. } => Some(SoundCue::Wrong),
            MatchEvent::RoundStarted { .. } => Some(SoundCue::Round),
            MatchEvent::MatchFinished { .. } => Some(SoundCue::Triumph),
            _ => None,
        }
    }
}
