//! WebSocket protocol messages for the board.

use feud_core::{GamePhase, HostAction, MatchEvent, MatchState, SoundCue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Submit a host action (untyped, normalized by the session)
    HostAction { action: serde_json::Value },

    /// Pull the current snapshot
    GetState,

    /// Ask for server status
    Health,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with the assigned connection ID
    Welcome { connection_id: Uuid },

    /// Full board snapshot
    BoardState { state: MatchState },

    /// What the last applied action changed, with the sounds to play
    Events {
        events: Vec<MatchEvent>,
        cues: Vec<SoundCue>,
    },

    /// Actions the host can take right now
    ValidActions { actions: Vec<HostAction> },

    /// The issuing client's action was not applied
    ActionRejected {
        action: Option<String>,
        reason: String,
    },

    /// Server status
    Health(HealthInfo),

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

impl ServerMessage {
    /// Events message with the cues derived from each event
    pub fn events(events: Vec<MatchEvent>) -> Self {
        let cues = events.iter().filter_map(MatchEvent::sound_cue).collect();
        ServerMessage::Events { events, cues }
    }
}

/// Server status for health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInfo {
    pub ok: bool,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub phase: GamePhase,
    pub rounds_total: u32,
    pub viewers: usize,
    pub actions_applied: u64,
    pub actions_rejected: u64,
}
