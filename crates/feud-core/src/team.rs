//! Team state.
//!
//! A match always has exactly two teams, `A` and `B`. Team identity is
//! permanent; names, scores and strikes are reset at the transition points
//! driven by the match engine.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Team identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamId {
    A,
    B,
}

impl TeamId {
    /// Both teams in board order
    pub const ALL: [TeamId; 2] = [TeamId::A, TeamId::B];

    /// The opposing team
    pub fn other(self) -> TeamId {
        match self {
            TeamId::A => TeamId::B,
            TeamId::B => TeamId::A,
        }
    }

    /// Name used when the host leaves a team name blank
    pub fn default_name(self) -> &'static str {
        match self {
            TeamId::A => "Equipo 1",
            TeamId::B => "Equipo 2",
        }
    }

    /// Parse the wire identifier (`"A"` or `"B"`)
    pub fn parse(s: &str) -> Option<TeamId> {
        match s {
            "A" => Some(TeamId::A),
            "B" => Some(TeamId::B),
            _ => None,
        }
    }
}

/// A team's state on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamState {
    pub id: TeamId,
    pub name: String,
    /// Can go negative after a successful steal against this team
    pub score: i64,
    pub strikes: u8,
}

impl TeamState {
    /// Create a team with its default name and a clean slate
    pub fn new(id: TeamId) -> Self {
        Self {
            id,
            name: id.default_name().to_string(),
            score: 0,
            strikes: 0,
        }
    }

    /// Rename the team and clear score and strikes
    pub fn restart_as(&mut self, name: String) {
        self.name = name;
        self.score = 0;
        self.strikes = 0;
    }
}

/// Result of comparing the two team scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leader {
    Team(TeamId),
    Tie,
}

/// Both teams, keyed `A` / `B` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    #[serde(rename = "A")]
    pub a: TeamState,
    #[serde(rename = "B")]
    pub b: TeamState,
}

impl Teams {
    pub fn new() -> Self {
        Self {
            a: TeamState::new(TeamId::A),
            b: TeamState::new(TeamId::B),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TeamState> {
        [&self.a, &self.b].into_iter()
    }

    pub fn reset_scores(&mut self) {
        self.a.score = 0;
        self.b.score = 0;
    }

    pub fn clear_strikes(&mut self) {
        self.a.strikes = 0;
        self.b.strikes = 0;
    }

    pub fn any_strikes(&self) -> bool {
        self.iter().any(|t| t.strikes > 0)
    }

    /// Strict score comparison; equal scores are a tie
    pub fn leader(&self) -> Leader {
        use std::cmp::Ordering;

        match self.a.score.cmp(&self.b.score) {
            Ordering::Greater => Leader::Team(TeamId::A),
            Ordering::Less => Leader::Team(TeamId::B),
            Ordering::Equal => Leader::Tie,
        }
    }
}

impl Default for Teams {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<TeamId> for Teams {
    type Output = TeamState;

    fn index(&self, id: TeamId) -> &TeamState {
        match id {
            TeamId::A => &self.a,
            TeamId::B => &self.b,
        }
    }
}

impl IndexMut<TeamId> for Teams {
    fn index_mut(&mut self, id: TeamId) -> &mut TeamState {
        match id {
            TeamId::A => &mut self.a,
            TeamId::B => &mut self.b,
        }
    }
}
