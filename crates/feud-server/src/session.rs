//! The single match session shared by every connection.

use feud_core::{
    Deck, HostAction, MatchEngine, MatchError, MatchEvent, MatchState, PayloadError,
    QuestionBank, QuestionSource, RawRound,
};
use thiserror::Error;

use crate::config::ServerConfig;
use crate::protocol::HealthInfo;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Malformed action: {0}")]
    Payload(#[from] PayloadError),

    #[error("{0}")]
    Rejected(#[from] MatchError),
}

/// Result of an applied action, ready to broadcast
#[derive(Debug, Clone)]
pub struct Applied {
    pub kind: &'static str,
    pub events: Vec<MatchEvent>,
    pub state: MatchState,
    pub valid_actions: Vec<HostAction>,
}

/// The match engine plus bookkeeping for the transport.
pub struct MatchSession<S = Deck<RawRound>> {
    engine: MatchEngine<S>,
    actions_applied: u64,
    actions_rejected: u64,
}

impl MatchSession {
    /// Session drawing its rounds from a question bank
    pub fn from_bank(bank: QuestionBank) -> Self {
        Self::new(bank.into_deck())
    }
}

impl<S: QuestionSource> MatchSession<S> {
    pub fn new(source: S) -> Self {
        Self {
            engine: MatchEngine::new(source),
            actions_applied: 0,
            actions_rejected: 0,
        }
    }

    /// Normalize and apply a raw host action
    pub fn apply_action(&mut self, action: serde_json::Value) -> Result<Applied, SessionError> {
        let result = HostAction::from_value(action)
            .map_err(SessionError::from)
            .and_then(|action| {
                let kind = action.kind();
                let events = self.engine.apply(action)?;
                Ok((kind, events))
            });

        match result {
            Ok((kind, events)) => {
                self.actions_applied += 1;
                Ok(Applied {
                    kind,
                    events,
                    state: self.snapshot(),
                    valid_actions: self.valid_actions(),
                })
            }
            Err(e) => {
                self.actions_rejected += 1;
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> MatchState {
        self.engine.state().clone()
    }

    pub fn valid_actions(&self) -> Vec<HostAction> {
        self.engine.valid_actions()
    }

    pub fn health(&self, viewers: usize, config: &ServerConfig) -> HealthInfo {
        let state = self.engine.state();
        HealthInfo {
            ok: true,
            port: config.addr.port(),
            allowed_origins: config.allowed_origins.clone(),
            phase: state.phase,
            rounds_total: state.rounds_total,
            viewers,
            actions_applied: self.actions_applied,
            actions_rejected: self.actions_rejected,
        }
    }
}
