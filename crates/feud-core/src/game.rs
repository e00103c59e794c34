//! Core match state machine.
//!
//! This module contains the board snapshot ([`MatchState`]) and the engine
//! that owns it ([`MatchEngine`]). Every host action is validated against
//! the current phase before anything is touched, so a rejected action
//! leaves the snapshot exactly as it was.

use crate::actions::{HostAction, MatchEvent};
use crate::questions::{supply, QuestionSource};
use crate::round::RoundContent;
use crate::team::{Leader, TeamId, Teams};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Match length used until the host picks one
pub const DEFAULT_ROUNDS_TOTAL: u32 = 10;

/// Shortest allowed match
pub const MIN_ROUNDS_TOTAL: u32 = 1;

/// Longest allowed match
pub const MAX_ROUNDS_TOTAL: u32 = 50;

/// Wrong guesses before the turn team loses the round to a steal
pub const MAX_STRIKES: u8 = 3;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    /// Naming teams and choosing the match length
    Setup,
    /// Normal play, reveals score for the team in turn
    Playing,
    /// The turn team struck out, the other team gets one guess
    Steal,
    /// Steal settled, reveals are display-only
    PostReveal,
    /// Last round done, waiting for the challenger decision
    Finished,
}

/// Steal in progress (or settled) for the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Steal {
    pub defender: TeamId,
    pub stealer: TeamId,
    pub resolved: bool,
}

/// Final result of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchWinner {
    A,
    B,
    Tie,
}

impl MatchWinner {
    /// The winning team, `None` on a tie
    pub fn team(self) -> Option<TeamId> {
        match self {
            MatchWinner::A => Some(TeamId::A),
            MatchWinner::B => Some(TeamId::B),
            MatchWinner::Tie => None,
        }
    }
}

impl From<Leader> for MatchWinner {
    fn from(leader: Leader) -> Self {
        match leader {
            Leader::Team(TeamId::A) => MatchWinner::A,
            Leader::Team(TeamId::B) => MatchWinner::B,
            Leader::Tie => MatchWinner::Tie,
        }
    }
}

/// Why an action was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MatchError {
    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("No answer at index {0}")]
    NoSuchAnswer(usize),

    #[error("Answer {0} is already revealed")]
    AlreadyRevealed(usize),

    #[error("Answer {0} is not revealed")]
    NotRevealed(usize),

    #[error("Answer {0} has no text or points")]
    UnplayableAnswer(usize),

    #[error("Scoring is locked for this round")]
    ScoringLocked,

    #[error("No steal in progress")]
    NoSteal,

    #[error("Round has not been played yet")]
    RoundNotPlayed,

    #[error("No team won, nobody keeps a seat")]
    NoWinner,

    #[error("The winning team keeps its name")]
    WinnerRenamed,

    #[error("This action is disabled")]
    Disabled,
}

/// The full board snapshot broadcast to every viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    pub phase: GamePhase,
    pub rounds_total: u32,
    /// 1-based, always `round_index + 1`
    pub round: u32,
    pub round_index: u32,
    pub max_strikes: u8,
    pub teams: Teams,
    /// Team currently answering
    pub turn_team: TeamId,
    /// Base points credited to the turn team this round. Wider than a
    /// single answer's points so five maximal answers still fit.
    pub round_bank: u64,
    /// Once set, reveals no longer touch scores
    pub scoring_locked: bool,
    pub steal: Option<Steal>,
    pub winner: Option<MatchWinner>,
    pub awaiting_challenger_decision: bool,
    pub current: RoundContent,
}

impl MatchState {
    /// Fresh state in setup, showing the first round of `rounds`
    pub fn new(rounds_total: u32, rounds: &[RoundContent]) -> Self {
        Self {
            phase: GamePhase::Setup,
            rounds_total,
            round: 1,
            round_index: 0,
            max_strikes: MAX_STRIKES,
            teams: Teams::new(),
            turn_team: TeamId::A,
            round_bank: 0,
            scoring_locked: false,
            steal: None,
            winner: None,
            awaiting_challenger_decision: false,
            current: round_at(rounds, 0),
        }
    }

    /// A round counts as played once anything happened in it
    pub fn round_has_progress(&self) -> bool {
        self.current.any_revealed() || self.teams.any_strikes() || self.round_bank > 0
    }

    /// Winner by final score
    pub fn compute_winner(&self) -> MatchWinner {
        self.teams.leader().into()
    }

    /// Points a successful steal moves from defender to stealer
    pub fn steal_transfer(&self) -> i64 {
        self.current.multiplier.apply(self.round_bank)
    }

    /// Whether reveals currently credit the turn team
    pub fn is_scoring(&self) -> bool {
        self.phase == GamePhase::Playing && !self.scoring_locked
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::Finished
    }

    /// The team still holding its seat when a challenger may step in
    pub fn challenger_seat_holder(&self) -> Option<TeamId> {
        if self.phase == GamePhase::Finished && self.awaiting_challenger_decision {
            self.winner.and_then(MatchWinner::team)
        } else {
            None
        }
    }
}

fn round_at(rounds: &[RoundContent], index: usize) -> RoundContent {
    rounds
        .get(index)
        .cloned()
        .unwrap_or_else(|| RoundContent::placeholder(index))
}

/// Name to use for a team: the submitted one, else `fallback`, else the default
fn pick_name(submitted: &str, fallback: &str, team: TeamId) -> String {
    [submitted.trim(), fallback.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or(team.default_name())
        .to_string()
}

/// Single owner of the match.
///
/// Holds the broadcast snapshot, the match's pre-selected round list (kept
/// out of the snapshot so upcoming questions are never sent to viewers) and
/// the question source used to regenerate it.
#[derive(Debug)]
pub struct MatchEngine<S> {
    state: MatchState,
    rounds: Vec<RoundContent>,
    source: S,
}

impl<S: QuestionSource> MatchEngine<S> {
    /// Create an engine in setup with a freshly drawn default-length match
    pub fn new(mut source: S) -> Self {
        let rounds = supply(&mut source, DEFAULT_ROUNDS_TOTAL as usize);
        Self {
            state: MatchState::new(DEFAULT_ROUNDS_TOTAL, &rounds),
            rounds,
            source,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Rounds selected for the current match
    pub fn rounds(&self) -> &[RoundContent] {
        &self.rounds
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Apply an action to the match.
    ///
    /// On `Err` nothing changed and viewers need no new snapshot.
    pub fn apply(&mut self, action: HostAction) -> Result<Vec<MatchEvent>, MatchError> {
        self.validate(&action)?;
        debug!(action = action.kind(), "applying host action");
        Ok(self.execute(action))
    }

    /// Check an action against the current state without applying it
    pub fn validate(&self, action: &HostAction) -> Result<(), MatchError> {
        let state = &self.state;
        let phase = state.phase;

        match action {
            HostAction::SetTeams { team_a, team_b } => {
                if phase == GamePhase::Setup {
                    return Ok(());
                }
                if phase != GamePhase::Finished || !state.awaiting_challenger_decision {
                    return Err(MatchError::InvalidPhase);
                }
                let winner = state.challenger_seat_holder().ok_or(MatchError::NoWinner)?;
                let submitted = match winner {
                    TeamId::A => team_a,
                    TeamId::B => team_b,
                };
                let submitted = submitted.trim();
                // A blank name keeps the winner's current one
                if !submitted.is_empty() && submitted != state.teams[winner].name {
                    return Err(MatchError::WinnerRenamed);
                }
                Ok(())
            }

            HostAction::SetRoundsTotal { .. } | HostAction::StartMatch => {
                require(phase == GamePhase::Setup)
            }

            HostAction::SetTurnTeam { .. } => {
                require(!matches!(phase, GamePhase::Setup | GamePhase::Steal))
            }

            HostAction::Reveal { index } => {
                require(phase != GamePhase::Setup)?;
                let answer = state
                    .current
                    .answers
                    .get(*index)
                    .ok_or(MatchError::NoSuchAnswer(*index))?;
                if answer.revealed {
                    return Err(MatchError::AlreadyRevealed(*index));
                }
                if !answer.is_playable() {
                    return Err(MatchError::UnplayableAnswer(*index));
                }
                Ok(())
            }

            HostAction::Hide { index } => {
                require(phase != GamePhase::Setup)?;
                let answer = state
                    .current
                    .answers
                    .get(*index)
                    .ok_or(MatchError::NoSuchAnswer(*index))?;
                if !answer.revealed {
                    return Err(MatchError::NotRevealed(*index));
                }
                Ok(())
            }

            HostAction::RevealAll | HostAction::HideAll => require(phase != GamePhase::Setup),

            HostAction::StrikeAdd => {
                require(phase == GamePhase::Playing)?;
                if state.scoring_locked {
                    return Err(MatchError::ScoringLocked);
                }
                Ok(())
            }

            HostAction::StealResolve { .. } => {
                require(phase == GamePhase::Steal)?;
                state.steal.map(|_| ()).ok_or(MatchError::NoSteal)
            }

            HostAction::NextRound => {
                require(!matches!(phase, GamePhase::Setup | GamePhase::Steal))?;
                if phase == GamePhase::Playing && !state.round_has_progress() {
                    return Err(MatchError::RoundNotPlayed);
                }
                Ok(())
            }

            HostAction::StrikeClear | HostAction::ChallengerYes { .. } => Err(MatchError::Disabled),

            HostAction::ChallengerNo => require(phase == GamePhase::Finished),

            HostAction::ResetAll => Ok(()),
        }
    }

    /// Every action that would currently be accepted, with representative
    /// payloads for the ones that carry data
    pub fn valid_actions(&self) -> Vec<HostAction> {
        let state = &self.state;
        let mut candidates = vec![
            HostAction::SetTeams {
                team_a: state.teams.a.name.clone(),
                team_b: state.teams.b.name.clone(),
            },
            HostAction::SetRoundsTotal {
                rounds_total: state.rounds_total,
            },
            HostAction::StartMatch,
            HostAction::RevealAll,
            HostAction::HideAll,
            HostAction::StrikeAdd,
            HostAction::StealResolve { success: true },
            HostAction::StealResolve { success: false },
            HostAction::NextRound,
            HostAction::ChallengerNo,
            HostAction::ResetAll,
        ];
        candidates.extend(TeamId::ALL.map(|team| HostAction::SetTurnTeam { team }));
        for index in 0..state.current.answers.len() {
            candidates.push(HostAction::Reveal { index });
            candidates.push(HostAction::Hide { index });
        }

        candidates
            .into_iter()
            .filter(|action| self.validate(action).is_ok())
            .collect()
    }

    // ==================== Transitions ====================

    fn execute(&mut self, action: HostAction) -> Vec<MatchEvent> {
        let mut events = Vec::new();

        match action {
            HostAction::SetTeams { team_a, team_b } => {
                if let Some(winner) = self.state.challenger_seat_holder() {
                    events.push(self.seat_challenger(winner, &team_a, &team_b));
                } else {
                    let teams = &mut self.state.teams;
                    teams.a.restart_as(pick_name(&team_a, "", TeamId::A));
                    teams.b.restart_as(pick_name(&team_b, "", TeamId::B));
                    self.state.winner = None;
                    self.state.awaiting_challenger_decision = false;

                    events.push(MatchEvent::TeamsNamed {
                        team_a: teams.a.name.clone(),
                        team_b: teams.b.name.clone(),
                    });
                }
            }

            HostAction::SetRoundsTotal { rounds_total } => {
                self.state.rounds_total = rounds_total.clamp(MIN_ROUNDS_TOTAL, MAX_ROUNDS_TOTAL);
                self.regenerate_rounds();
                self.state.winner = None;
                self.state.awaiting_challenger_decision = false;
                self.reset_round(0);

                events.push(MatchEvent::RoundsTotalChanged {
                    rounds_total: self.state.rounds_total,
                });
            }

            HostAction::StartMatch => {
                self.regenerate_rounds();
                self.state.phase = GamePhase::Playing;
                self.state.winner = None;
                self.state.awaiting_challenger_decision = false;
                self.state.teams.reset_scores();
                self.reset_round(0);

                events.push(MatchEvent::MatchStarted {
                    rounds_total: self.state.rounds_total,
                });
                events.push(self.round_started());
            }

            HostAction::SetTurnTeam { team } => {
                self.state.turn_team = team;
                events.push(MatchEvent::TurnChanged { team });
            }

            HostAction::Reveal { index } => {
                let scoring = self.state.is_scoring();
                let multiplier = self.state.current.multiplier;
                let mut scored = 0;

                if let Some(answer) = self.state.current.answers.get_mut(index) {
                    answer.revealed = true;
                    if scoring {
                        let points = u64::from(answer.points);
                        scored = multiplier.apply(points);
                        self.state.round_bank = self.state.round_bank.saturating_add(points);
                        let turn = self.state.turn_team;
                        self.state.teams[turn].score += scored;
                    }
                }

                events.push(MatchEvent::AnswerRevealed { index, scored });
            }

            HostAction::Hide { index } => {
                let scoring = self.state.is_scoring();
                let multiplier = self.state.current.multiplier;
                let mut refunded = 0;

                if let Some(answer) = self.state.current.answers.get_mut(index) {
                    if scoring && answer.is_playable() {
                        let points = u64::from(answer.points);
                        refunded = multiplier.apply(points);
                        self.state.round_bank = self.state.round_bank.saturating_sub(points);
                        let turn = self.state.turn_team;
                        self.state.teams[turn].score -= refunded;
                    }
                    answer.revealed = false;
                }

                events.push(MatchEvent::AnswerHidden { index, refunded });
            }

            HostAction::RevealAll => {
                self.state.current.set_all_revealed(true);
                events.push(MatchEvent::AllRevealed);
            }

            HostAction::HideAll => {
                self.state.current.set_all_revealed(false);
                events.push(MatchEvent::AllHidden);
            }

            HostAction::StrikeAdd => {
                let team = self.state.turn_team;
                let strikes = (self.state.teams[team].strikes + 1).min(MAX_STRIKES);
                self.state.teams[team].strikes = strikes;
                events.push(MatchEvent::StrikeAdded { team, strikes });

                if strikes >= MAX_STRIKES {
                    let stealer = team.other();
                    self.state.phase = GamePhase::Steal;
                    self.state.steal = Some(Steal {
                        defender: team,
                        stealer,
                        resolved: false,
                    });
                    self.state.turn_team = stealer;

                    events.push(MatchEvent::StealOpened {
                        defender: team,
                        stealer,
                    });
                }
            }

            HostAction::StealResolve { success } => {
                if let Some(event) = self.resolve_steal(success) {
                    events.push(event);
                }
            }

            HostAction::NextRound => {
                let next = self.state.round + 1;
                if next > self.state.rounds_total {
                    let winner = self.state.compute_winner();
                    self.state.phase = GamePhase::Finished;
                    self.state.winner = Some(winner);
                    self.state.awaiting_challenger_decision = true;

                    events.push(MatchEvent::MatchFinished { winner });
                } else {
                    self.reset_round((next - 1) as usize);
                    self.state.phase = GamePhase::Playing;

                    events.push(self.round_started());
                }
            }

            HostAction::ChallengerNo => {
                self.state.phase = GamePhase::Setup;
                self.state.winner = None;
                self.state.awaiting_challenger_decision = false;
                self.regenerate_rounds();
                self.reset_round(0);

                events.push(MatchEvent::ReturnedToSetup);
            }

            HostAction::ResetAll => {
                let rounds = supply(&mut self.source, DEFAULT_ROUNDS_TOTAL as usize);
                self.state = MatchState::new(DEFAULT_ROUNDS_TOTAL, &rounds);
                self.rounds = rounds;

                events.push(MatchEvent::MatchReset);
            }

            // Rejected by validate
            HostAction::StrikeClear | HostAction::ChallengerYes { .. } => {}
        }

        events
    }

    /// Keep the winner seated, put the challenger in the loser's seat and
    /// return to setup
    fn seat_challenger(&mut self, winner: TeamId, team_a: &str, team_b: &str) -> MatchEvent {
        let teams = &mut self.state.teams;
        let name_a = pick_name(team_a, &teams.a.name, TeamId::A);
        let name_b = pick_name(team_b, &teams.b.name, TeamId::B);
        teams.a.restart_as(name_a);
        teams.b.restart_as(name_b);

        self.state.phase = GamePhase::Setup;
        self.state.winner = None;
        self.state.awaiting_challenger_decision = false;

        MatchEvent::ChallengerSeated {
            winner,
            challenger: self.state.teams[winner.other()].name.clone(),
        }
    }

    fn resolve_steal(&mut self, success: bool) -> Option<MatchEvent> {
        let steal = self.state.steal?;
        let Steal {
            defender, stealer, ..
        } = steal;
        let mut transferred = 0;

        if success {
            transferred = self.state.steal_transfer();
            self.state.teams[defender].score -= transferred;
            self.state.teams[stealer].score += transferred;
            self.state.teams[stealer].strikes = 0;
        } else {
            // One visible mark for the missed steal
            self.state.teams[stealer].strikes = 1;
        }
        self.state.teams[defender].strikes = 0;

        self.state.steal = Some(Steal {
            resolved: true,
            ..steal
        });
        self.state.phase = GamePhase::PostReveal;
        self.state.scoring_locked = true;

        Some(MatchEvent::StealResolved {
            success,
            stealer,
            transferred,
        })
    }

    fn regenerate_rounds(&mut self) {
        self.rounds = supply(&mut self.source, self.state.rounds_total as usize);
    }

    /// Install round `index` and clear everything that belongs to a single round
    fn reset_round(&mut self, index: usize) {
        let state = &mut self.state;
        state.round_index = index as u32;
        state.round = index as u32 + 1;
        state.current = round_at(&self.rounds, index);
        state.teams.clear_strikes();
        state.turn_team = TeamId::A;
        state.round_bank = 0;
        state.scoring_locked = false;
        state.steal = None;
    }

    fn round_started(&self) -> MatchEvent {
        MatchEvent::RoundStarted {
            round: self.state.round,
            multiplier: self.state.current.multiplier.value(),
        }
    }
}

fn require(condition: bool) -> Result<(), MatchError> {
    if condition {
        Ok(())
    } else {
        Err(MatchError::InvalidPhase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::{RawAnswer, RawRound};

    /// Cycles through a fixed list of questions
    struct Cycle {
        rounds: Vec<RawRound>,
        next: usize,
    }

    impl QuestionSource for Cycle {
        fn draw(&mut self) -> Option<RawRound> {
            let round = self.rounds.get(self.next % self.rounds.len().max(1)).cloned();
            self.next += 1;
            round
        }
    }

    fn cycle(count: usize) -> Cycle {
        Cycle {
            rounds: (0..count)
                .map(|i| RawRound {
                    label: String::new(),
                    multiplier: 1.0,
                    question: format!("Question {}", i),
                    answers: [40.0, 25.0, 15.0, 12.0, 8.0]
                        .iter()
                        .enumerate()
                        .map(|(j, p)| RawAnswer::new(format!("Answer {}", j), *p))
                        .collect(),
                })
                .collect(),
            next: 0,
        }
    }

    fn playing() -> MatchEngine<Cycle> {
        let mut engine = MatchEngine::new(cycle(20));
        engine.apply(HostAction::StartMatch).unwrap();
        engine
    }

    #[test]
    fn test_new_match_starts_in_setup() {
        let engine = MatchEngine::new(cycle(20));
        let state = engine.state();
        assert_eq!(state.phase, GamePhase::Setup);
        assert_eq!(state.rounds_total, DEFAULT_ROUNDS_TOTAL);
        assert_eq!(state.round, 1);
        assert_eq!(state.max_strikes, 3);
        assert_eq!(engine.rounds().len(), 10);
        assert_eq!(state.current.answers.len(), 5);
    }

    #[test]
    fn test_setup_rejects_play_actions() {
        let mut engine = MatchEngine::new(cycle(20));
        let before = engine.state().clone();

        for action in [
            HostAction::Reveal { index: 0 },
            HostAction::StrikeAdd,
            HostAction::NextRound,
            HostAction::SetTurnTeam { team: TeamId::B },
            HostAction::RevealAll,
        ] {
            assert_eq!(engine.apply(action), Err(MatchError::InvalidPhase));
        }
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_rounds_total_is_clamped() {
        let mut engine = MatchEngine::new(cycle(60));
        engine
            .apply(HostAction::SetRoundsTotal { rounds_total: 500 })
            .unwrap();
        assert_eq!(engine.state().rounds_total, MAX_ROUNDS_TOTAL);

        engine
            .apply(HostAction::SetRoundsTotal { rounds_total: 0 })
            .unwrap();
        assert_eq!(engine.state().rounds_total, MIN_ROUNDS_TOTAL);
        assert_eq!(engine.rounds().len(), 1);
    }

    #[test]
    fn test_blank_names_use_defaults() {
        let mut engine = MatchEngine::new(cycle(20));
        engine
            .apply(HostAction::SetTeams {
                team_a: "   ".into(),
                team_b: " Azules ".into(),
            })
            .unwrap();
        assert_eq!(engine.state().teams.a.name, "Equipo 1");
        assert_eq!(engine.state().teams.b.name, "Azules");
    }

    #[test]
    fn test_reveal_scores_with_multiplier() {
        let mut engine = playing();
        // Skip to round 6, the first 2x round
        for _ in 0..5 {
            engine.apply(HostAction::StrikeAdd).unwrap();
            engine.apply(HostAction::NextRound).unwrap();
        }
        assert_eq!(engine.state().round, 6);
        assert_eq!(engine.state().current.multiplier.value(), 2);

        engine.apply(HostAction::Reveal { index: 0 }).unwrap();
        assert_eq!(engine.state().teams.a.score, 80);
        assert_eq!(engine.state().round_bank, 40);
    }

    #[test]
    fn test_large_points_fit_the_bank() {
        let huge = |i: usize| RawRound {
            label: String::new(),
            multiplier: 1.0,
            question: format!("Big {}", i),
            answers: (0..5)
                .map(|j| RawAnswer::new(format!("Answer {}", j), 3_000_000_000.0))
                .collect(),
        };
        let mut engine = MatchEngine::new(Cycle {
            rounds: (0..10).map(huge).collect(),
            next: 0,
        });
        engine.apply(HostAction::StartMatch).unwrap();
        engine.apply(HostAction::Reveal { index: 0 }).unwrap();
        engine.apply(HostAction::Reveal { index: 1 }).unwrap();

        assert_eq!(engine.state().round_bank, 6_000_000_000);
        assert_eq!(engine.state().teams.a.score, 6_000_000_000);

        for _ in 0..3 {
            engine.apply(HostAction::StrikeAdd).unwrap();
        }
        engine
            .apply(HostAction::StealResolve { success: true })
            .unwrap();
        assert_eq!(engine.state().teams.a.score, 0);
        assert_eq!(engine.state().teams.b.score, 6_000_000_000);
    }

    #[test]
    fn test_reveal_twice_is_rejected() {
        let mut engine = playing();
        engine.apply(HostAction::Reveal { index: 1 }).unwrap();
        assert_eq!(
            engine.apply(HostAction::Reveal { index: 1 }),
            Err(MatchError::AlreadyRevealed(1))
        );
        assert_eq!(engine.state().teams.a.score, 25);
        assert_eq!(
            engine.apply(HostAction::Reveal { index: 9 }),
            Err(MatchError::NoSuchAnswer(9))
        );
    }

    #[test]
    fn test_hide_refunds_reveal() {
        let mut engine = playing();
        engine.apply(HostAction::Reveal { index: 0 }).unwrap();
        engine.apply(HostAction::Reveal { index: 2 }).unwrap();

        let events = engine.apply(HostAction::Hide { index: 0 }).unwrap();
        assert_eq!(events, vec![MatchEvent::AnswerHidden { index: 0, refunded: 40 }]);
        assert_eq!(engine.state().teams.a.score, 15);
        assert_eq!(engine.state().round_bank, 15);
        assert_eq!(
            engine.apply(HostAction::Hide { index: 0 }),
            Err(MatchError::NotRevealed(0))
        );
    }

    #[test]
    fn test_reveal_all_never_scores() {
        let mut engine = playing();
        engine.apply(HostAction::RevealAll).unwrap();
        assert_eq!(engine.state().current.revealed_count(), 5);
        assert_eq!(engine.state().teams.a.score, 0);

        engine.apply(HostAction::HideAll).unwrap();
        assert_eq!(engine.state().current.revealed_count(), 0);
        assert_eq!(engine.state().round_bank, 0);
    }

    #[test]
    fn test_turn_team_scores() {
        let mut engine = playing();
        engine
            .apply(HostAction::SetTurnTeam { team: TeamId::B })
            .unwrap();
        engine.apply(HostAction::Reveal { index: 3 }).unwrap();
        assert_eq!(engine.state().teams.b.score, 12);
        assert_eq!(engine.state().teams.a.score, 0);
    }

    #[test]
    fn test_failed_steal_marks_stealer_once() {
        let mut engine = playing();
        engine.apply(HostAction::Reveal { index: 0 }).unwrap();
        for _ in 0..3 {
            engine.apply(HostAction::StrikeAdd).unwrap();
        }

        let events = engine
            .apply(HostAction::StealResolve { success: false })
            .unwrap();
        assert_eq!(
            events,
            vec![MatchEvent::StealResolved {
                success: false,
                stealer: TeamId::B,
                transferred: 0
            }]
        );

        let state = engine.state();
        assert_eq!(state.teams.b.strikes, 1);
        assert_eq!(state.teams.a.strikes, 0);
        assert_eq!(state.teams.a.score, 40);
        assert_eq!(state.phase, GamePhase::PostReveal);
        assert!(state.scoring_locked);
    }

    #[test]
    fn test_post_reveal_is_display_only() {
        let mut engine = playing();
        for _ in 0..3 {
            engine.apply(HostAction::StrikeAdd).unwrap();
        }
        engine
            .apply(HostAction::StealResolve { success: true })
            .unwrap();

        let events = engine.apply(HostAction::Reveal { index: 0 }).unwrap();
        assert_eq!(events, vec![MatchEvent::AnswerRevealed { index: 0, scored: 0 }]);
        assert_eq!(engine.state().round_bank, 0);
        assert_eq!(engine.apply(HostAction::StrikeAdd), Err(MatchError::InvalidPhase));
        // Hiding a display-only reveal refunds nothing
        engine.apply(HostAction::Hide { index: 0 }).unwrap();
        assert_eq!(engine.state().teams.b.score, 0);
    }

    #[test]
    fn test_steal_phase_blocks_turn_and_next_round() {
        let mut engine = playing();
        for _ in 0..3 {
            engine.apply(HostAction::StrikeAdd).unwrap();
        }
        assert_eq!(
            engine.apply(HostAction::SetTurnTeam { team: TeamId::A }),
            Err(MatchError::InvalidPhase)
        );
        assert_eq!(engine.apply(HostAction::NextRound), Err(MatchError::InvalidPhase));
        assert_eq!(engine.apply(HostAction::StrikeAdd), Err(MatchError::InvalidPhase));
    }

    #[test]
    fn test_disabled_actions() {
        let mut engine = playing();
        engine.apply(HostAction::StrikeAdd).unwrap();
        assert_eq!(engine.apply(HostAction::StrikeClear), Err(MatchError::Disabled));
        assert_eq!(
            engine.apply(HostAction::ChallengerYes {
                challenger_name: "Verdes".into()
            }),
            Err(MatchError::Disabled)
        );
        assert_eq!(engine.state().teams.a.strikes, 1);
    }

    #[test]
    fn test_next_round_resets_round_state() {
        let mut engine = playing();
        engine
            .apply(HostAction::SetTurnTeam { team: TeamId::B })
            .unwrap();
        engine.apply(HostAction::Reveal { index: 0 }).unwrap();
        engine.apply(HostAction::StrikeAdd).unwrap();

        let events = engine.apply(HostAction::NextRound).unwrap();
        assert_eq!(events, vec![MatchEvent::RoundStarted { round: 2, multiplier: 1 }]);

        let state = engine.state();
        assert_eq!(state.round, 2);
        assert_eq!(state.round_index, 1);
        assert_eq!(state.turn_team, TeamId::A);
        assert_eq!(state.round_bank, 0);
        assert!(!state.teams.any_strikes());
        assert_eq!(state.current.revealed_count(), 0);
        // Scores carry over between rounds
        assert_eq!(state.teams.b.score, 40);
    }

    #[test]
    fn test_tie_has_no_challenger_seat() {
        let mut engine = MatchEngine::new(cycle(5));
        engine
            .apply(HostAction::SetRoundsTotal { rounds_total: 1 })
            .unwrap();
        engine.apply(HostAction::StartMatch).unwrap();
        engine.apply(HostAction::StrikeAdd).unwrap();
        engine.apply(HostAction::NextRound).unwrap();

        assert_eq!(engine.state().winner, Some(MatchWinner::Tie));
        assert_eq!(
            engine.apply(HostAction::SetTeams {
                team_a: "X".into(),
                team_b: "Y".into()
            }),
            Err(MatchError::NoWinner)
        );
    }

    #[test]
    fn test_challenger_no_returns_to_setup() {
        let mut engine = MatchEngine::new(cycle(5));
        engine
            .apply(HostAction::SetRoundsTotal { rounds_total: 1 })
            .unwrap();
        engine.apply(HostAction::StartMatch).unwrap();
        assert_eq!(engine.apply(HostAction::ChallengerNo), Err(MatchError::InvalidPhase));

        engine.apply(HostAction::Reveal { index: 0 }).unwrap();
        engine.apply(HostAction::NextRound).unwrap();
        engine.apply(HostAction::ChallengerNo).unwrap();

        let state = engine.state();
        assert_eq!(state.phase, GamePhase::Setup);
        assert_eq!(state.winner, None);
        assert!(!state.awaiting_challenger_decision);
        assert_eq!(state.round, 1);
        assert_eq!(state.rounds_total, 1);
    }

    #[test]
    fn test_reset_all() {
        let mut engine = playing();
        engine
            .apply(HostAction::SetTeams {
                team_a: "X".into(),
                team_b: "Y".into(),
            })
            .unwrap_err();
        engine.apply(HostAction::Reveal { index: 0 }).unwrap();

        engine.apply(HostAction::ResetAll).unwrap();
        let state = engine.state();
        assert_eq!(state.phase, GamePhase::Setup);
        assert_eq!(state.teams, Teams::new());
        assert_eq!(state.rounds_total, DEFAULT_ROUNDS_TOTAL);
        assert_eq!(engine.rounds().len(), DEFAULT_ROUNDS_TOTAL as usize);
    }

    #[test]
    fn test_placeholder_when_content_runs_out() {
        let mut engine = MatchEngine::new(cycle(0));
        assert!(engine.state().current.is_placeholder());

        engine.apply(HostAction::StartMatch).unwrap();
        assert_eq!(
            engine.apply(HostAction::Reveal { index: 0 }),
            Err(MatchError::NoSuchAnswer(0))
        );
        // A strike still counts as progress on an empty board
        engine.apply(HostAction::StrikeAdd).unwrap();
        engine.apply(HostAction::NextRound).unwrap();
        assert_eq!(engine.state().current.label, "Round 2");
    }

    #[test]
    fn test_valid_actions_in_setup() {
        let engine = MatchEngine::new(cycle(20));
        let kinds: Vec<&str> = engine.valid_actions().iter().map(|a| a.kind()).collect();
        assert_eq!(
            kinds,
            vec!["SET_TEAMS", "SET_ROUNDS_TOTAL", "START_MATCH", "RESET_ALL"]
        );
    }

    #[test]
    fn test_valid_actions_in_steal() {
        let mut engine = playing();
        for _ in 0..3 {
            engine.apply(HostAction::StrikeAdd).unwrap();
        }
        let actions = engine.valid_actions();
        assert!(actions.contains(&HostAction::StealResolve { success: true }));
        assert!(actions.contains(&HostAction::Reveal { index: 0 }));
        assert!(!actions.contains(&HostAction::NextRound));
        assert!(!actions.iter().any(|a| matches!(a, HostAction::SetTurnTeam { .. })));
    }

    #[test]
    fn test_snapshot_wire_format() {
        let engine = MatchEngine::new(cycle(20));
        let json = serde_json::to_value(engine.state()).unwrap();
        assert_eq!(json["phase"], "SETUP");
        assert_eq!(json["roundsTotal"], 10);
        assert_eq!(json["roundIndex"], 0);
        assert_eq!(json["turnTeam"], "A");
        assert_eq!(json["awaitingChallengerDecision"], false);
        assert!(json["steal"].is_null());
        assert_eq!(json["teams"]["A"]["name"], "Equipo 1");
        assert_eq!(json["current"]["multiplier"], 1);
    }
}
