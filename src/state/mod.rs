//! Game state: the full record of a match and the only place it mutates.
//!
//! `GameState` owns the players, the per-day nomination and vote books, and
//! the append-only action log. Phase controllers drive it exclusively
//! through its methods; there is no way to put the state into an
//! inconsistent shape from outside this module.

pub mod log;
pub mod player;

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub use log::{ActionRecord, EliminationReason, GameOverReason};
pub use player::{DonCheck, Player, PlayerId, PlayerStatus, SheriffCheck, SpeechRecord, id_list};

use crate::roles::{RoleKind, Team, role_distribution};

/// Where the game currently is. `GameOver` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Day,
    Night,
    Voting,
    GameOver,
    Failed,
}

impl Phase {
    /// Terminal phases accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver | Self::Failed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Setup => "setup",
            Self::Day => "day",
            Self::Night => "night",
            Self::Voting => "voting",
            Self::GameOver => "game_over",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Compact per-player line for snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub role: RoleKind,
    pub team: Team,
    pub alive: bool,
}

/// Serializable snapshot of where the game stands.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub phase: Phase,
    pub day: u32,
    pub night: u32,
    pub alive: usize,
    pub mafia_alive: usize,
    pub civilians_alive: usize,
    pub winner: Option<Team>,
    pub players: Vec<PlayerSummary>,
}

/// The complete state of one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    phase: Phase,
    day: u32,
    night: u32,
    players: Vec<Player>,
    nominations: BTreeMap<u32, Vec<PlayerId>>,
    votes: BTreeMap<u32, BTreeMap<PlayerId, PlayerId>>,
    night_kills: BTreeMap<u32, Option<PlayerId>>,
    action_log: Vec<ActionRecord>,
    winner: Option<Team>,
    max_rounds: Option<u32>,
    random_seed: u64,
    last_day_starter: Option<PlayerId>,
}

impl GameState {
    /// Creates a fresh ten-player game with roles dealt from the seeded
    /// shuffle. The match opens on day one; there is no night zero.
    #[must_use]
    pub fn new(max_rounds: Option<u32>, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::random());
        let mut roles = role_distribution();
        let mut rng = StdRng::seed_from_u64(seed);
        roles.shuffle(&mut rng);
        Self::with_roles(roles, max_rounds, seed)
    }

    /// Creates a game with an explicit seating of roles. Seat `i` receives
    /// `roles[i]` as player `i + 1`.
    #[must_use]
    pub fn with_roles(roles: [RoleKind; 10], max_rounds: Option<u32>, seed: u64) -> Self {
        let players: Vec<Player> = roles
            .iter()
            .enumerate()
            .filter_map(|(i, &role)| {
                PlayerId::new(i as u8 + 1).map(|id| Player::new(id, role))
            })
            .collect();

        let roster: Vec<PlayerId> = players
            .iter()
            .filter(|p| p.is_black())
            .map(Player::id)
            .collect();
        let ids: Vec<PlayerId> = players.iter().map(Player::id).collect();

        let mut state = Self {
            phase: Phase::Day,
            day: 1,
            night: 0,
            players,
            nominations: BTreeMap::new(),
            votes: BTreeMap::new(),
            night_kills: BTreeMap::new(),
            action_log: Vec::new(),
            winner: None,
            max_rounds,
            random_seed: seed,
            last_day_starter: None,
        };
        for player in &mut state.players {
            if player.is_black() {
                player.grant_mafia_knowledge(roster.clone());
            }
        }
        state.action_log.push(ActionRecord::GameStart { players: ids });
        state.nominations.insert(1, Vec::new());
        state.action_log.push(ActionRecord::DayStart { day: 1 });
        state
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn day(&self) -> u32 {
        self.day
    }

    #[must_use]
    pub const fn night(&self) -> u32 {
        self.night
    }

    #[must_use]
    pub const fn winner(&self) -> Option<Team> {
        self.winner
    }

    #[must_use]
    pub const fn max_rounds(&self) -> Option<u32> {
        self.max_rounds
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.random_seed
    }

    #[must_use]
    pub const fn last_day_starter(&self) -> Option<PlayerId> {
        self.last_day_starter
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id() == id)
    }

    /// Living players in seat order.
    pub fn alive(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive())
    }

    #[must_use]
    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.alive().map(Player::id).collect()
    }

    #[must_use]
    pub fn mafia_alive(&self) -> Vec<PlayerId> {
        self.alive().filter(|p| p.is_black()).map(Player::id).collect()
    }

    #[must_use]
    pub fn civilians_alive(&self) -> Vec<PlayerId> {
        self.alive().filter(|p| !p.is_black()).map(Player::id).collect()
    }

    #[must_use]
    pub fn sheriff_alive(&self) -> Option<PlayerId> {
        self.alive()
            .find(|p| p.role() == RoleKind::Sheriff)
            .map(Player::id)
    }

    #[must_use]
    pub fn don_alive(&self) -> Option<PlayerId> {
        self.alive()
            .find(|p| p.role() == RoleKind::Don)
            .map(Player::id)
    }

    /// A target is valid only while alive.
    #[must_use]
    pub fn is_valid_target(&self, id: PlayerId) -> bool {
        self.player(id).is_some_and(Player::is_alive)
    }

    /// Nominees for the given day, in first-nomination order.
    #[must_use]
    pub fn nominations_for(&self, day: u32) -> &[PlayerId] {
        self.nominations.get(&day).map_or(&[], Vec::as_slice)
    }

    /// Explicit votes cast on the given day, keyed by voter.
    #[must_use]
    pub fn votes_for(&self, day: u32) -> Option<&BTreeMap<PlayerId, PlayerId>> {
        self.votes.get(&day)
    }

    #[must_use]
    pub fn night_kill(&self, night: u32) -> Option<PlayerId> {
        self.night_kills.get(&night).copied().flatten()
    }

    #[must_use]
    pub fn log(&self) -> &[ActionRecord] {
        &self.action_log
    }

    #[must_use]
    pub fn summary(&self) -> GameSummary {
        GameSummary {
            phase: self.phase,
            day: self.day,
            night: self.night,
            alive: self.alive().count(),
            mafia_alive: self.mafia_alive().len(),
            civilians_alive: self.civilians_alive().len(),
            winner: self.winner,
            players: self
                .players
                .iter()
                .map(|p| PlayerSummary {
                    id: p.id(),
                    role: p.role(),
                    team: p.role().team(),
                    alive: p.is_alive(),
                })
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Phase transitions
    // ------------------------------------------------------------------

    /// Advances to the next day. No-op once the game is over.
    pub fn start_day(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = Phase::Day;
        self.day += 1;
        self.nominations.entry(self.day).or_default();
        self.action_log.push(ActionRecord::DayStart { day: self.day });
    }

    /// Advances to the next night. No-op once the game is over.
    pub fn start_night(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = Phase::Night;
        self.night += 1;
        self.action_log.push(ActionRecord::NightStart { night: self.night });
    }

    /// Moves the current day into its voting stage.
    pub fn start_voting(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = Phase::Voting;
        self.votes.entry(self.day).or_default();
        self.action_log.push(ActionRecord::VotingStart { day: self.day });
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub(crate) fn record_speech(&mut self, id: PlayerId, text: String, closing: bool) {
        let day = self.day;
        if let Some(player) = self.player_mut(id) {
            player.add_speech(day, text.clone(), closing);
        }
        self.action_log.push(ActionRecord::Speech {
            player: id,
            day,
            text,
            closing,
        });
    }

    /// Appends a nominee for the current day. First-writer-wins: a target
    /// already on the list is not added again.
    pub(crate) fn record_nomination(&mut self, nominator: PlayerId, target: PlayerId) {
        let day = self.day;
        let nominees = self.nominations.entry(day).or_default();
        let accepted = !nominees.contains(&target);
        if accepted {
            nominees.push(target);
        }
        self.action_log.push(ActionRecord::Nomination {
            nominator,
            target,
            day,
            accepted,
        });
    }

    /// Replaces the current day's nominee list. Used when a tie narrows
    /// the ballot to the tied set.
    pub(crate) fn set_nominations(&mut self, day: u32, nominees: Vec<PlayerId>) {
        self.nominations.insert(day, nominees);
    }

    pub(crate) fn record_vote(&mut self, voter: PlayerId, target: PlayerId) {
        let day = self.day;
        self.votes.entry(day).or_default().insert(voter, target);
        if let Some(player) = self.player_mut(voter) {
            player.record_vote(day, target);
        }
        self.action_log.push(ActionRecord::Vote { voter, target, day });
    }

    /// Drops all explicit votes for the given day ahead of a revote.
    pub(crate) fn clear_votes(&mut self, day: u32) {
        self.votes.insert(day, BTreeMap::new());
    }

    pub(crate) fn record_night_kill(&mut self, victim: Option<PlayerId>) {
        self.night_kills.insert(self.night, victim);
    }

    pub fn set_last_day_starter(&mut self, id: PlayerId) {
        self.last_day_starter = Some(id);
    }

    /// Removes a player from the game and re-checks the win condition.
    /// Returns `true` if the elimination was applied; repeating it for a
    /// player who is already out, or eliminating after the game ended, is
    /// a no-op.
    pub fn eliminate(
        &mut self,
        id: PlayerId,
        reason: EliminationReason,
        voters: &[PlayerId],
    ) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        if !player.is_alive() {
            return false;
        }
        player.eliminate();

        let (day, night) = match reason {
            EliminationReason::NightKill => (None, Some(self.night)),
            _ => (Some(self.day), None),
        };
        self.action_log.push(ActionRecord::Elimination {
            player: id,
            reason,
            day,
            night,
            voters: voters.to_vec(),
        });

        if let Some(winner) = self.check_win_condition() {
            let reason = if self.max_rounds_reached() {
                GameOverReason::MaxRounds
            } else {
                GameOverReason::WinCondition
            };
            self.end_game(winner, reason);
        }
        true
    }

    /// Pure win rule. Red wins when no mafia remain; Black wins when the
    /// mafia match or outnumber the civilians. When the round cap is
    /// reached the comparison is forced either way.
    #[must_use]
    pub fn check_win_condition(&self) -> Option<Team> {
        let mafia = self.mafia_alive().len();
        let civilians = self.civilians_alive().len();
        if self.max_rounds_reached() {
            return Some(if mafia >= civilians { Team::Black } else { Team::Red });
        }
        if mafia == 0 {
            return Some(Team::Red);
        }
        if mafia >= civilians {
            return Some(Team::Black);
        }
        None
    }

    #[must_use]
    pub fn max_rounds_reached(&self) -> bool {
        self.max_rounds.is_some_and(|max| self.day >= max)
    }

    /// Terminates the game with a winner. Idempotent under a terminal
    /// phase.
    pub fn end_game(&mut self, winner: Team, reason: GameOverReason) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = Phase::GameOver;
        self.winner = Some(winner);
        self.action_log.push(ActionRecord::GameOver {
            winner: Some(winner),
            reason,
            day: self.day,
            night: self.night,
        });
    }

    /// Terminates the game without a winner after a fatal decision
    /// failure.
    pub fn fail(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = Phase::Failed;
        self.winner = None;
        self.action_log.push(ActionRecord::GameOver {
            winner: None,
            reason: GameOverReason::Failed,
            day: self.day,
            night: self.night,
        });
    }
}
