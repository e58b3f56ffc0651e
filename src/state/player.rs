//! Player records: identity, role, status, and per-role private ledgers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::roles::{RoleKind, Team};

/// Stable player identity, 1 through 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u8);

impl PlayerId {
    /// The lowest seat at the table.
    pub const FIRST: Self = Self(1);

    /// Creates an id if `n` is within the valid 1..=10 range.
    #[must_use]
    pub fn new(n: u8) -> Option<Self> {
        (1..=10).contains(&n).then_some(Self(n))
    }

    /// Returns the raw seat number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Formats a list of player ids as `[1, 4, 7]` for announcements.
#[must_use]
pub fn id_list(ids: &[PlayerId]) -> String {
    let inner = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{inner}]")
}

/// Lifecycle status. Transitions are one-way: a player never returns to
/// `Alive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Alive,
    Eliminated,
    Disqualified,
}

/// A speech with the day it was delivered, tagged at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRecord {
    /// Day the speech was given.
    pub day: u32,
    /// Full speech text, terminator included.
    pub text: String,
    /// Whether this was a closing statement after elimination.
    pub closing: bool,
}

/// Outcome of a Sheriff night check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheriffCheck {
    /// Player that was checked.
    pub target: PlayerId,
    /// Team the check revealed.
    pub team: Team,
}

/// Outcome of a Don night check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonCheck {
    /// Player that was checked.
    pub target: PlayerId,
    /// Whether the target is the Sheriff.
    pub is_sheriff: bool,
}

/// One participant: identity, role, status, public history, and the
/// role-private knowledge only this player's decision source may see.
///
/// All check and claim ledgers are keyed by night number so history never
/// has to be reconstructed after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    role: RoleKind,
    status: PlayerStatus,
    speeches: Vec<SpeechRecord>,
    nominations_made: Vec<PlayerId>,
    votes_cast: BTreeMap<u32, PlayerId>,
    known_mafia: Vec<PlayerId>,
    sheriff_checks: BTreeMap<u32, SheriffCheck>,
    don_checks: BTreeMap<u32, DonCheck>,
    kill_claims: BTreeMap<u32, PlayerId>,
    kill_decisions: BTreeMap<u32, PlayerId>,
}

impl Player {
    /// Creates a living player with no history.
    #[must_use]
    pub fn new(id: PlayerId, role: RoleKind) -> Self {
        Self {
            id,
            role,
            status: PlayerStatus::Alive,
            speeches: Vec::new(),
            nominations_made: Vec::new(),
            votes_cast: BTreeMap::new(),
            known_mafia: Vec::new(),
            sheriff_checks: BTreeMap::new(),
            don_checks: BTreeMap::new(),
            kill_claims: BTreeMap::new(),
            kill_decisions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    #[must_use]
    pub const fn role(&self) -> RoleKind {
        self.role
    }

    #[must_use]
    pub const fn status(&self) -> PlayerStatus {
        self.status
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status == PlayerStatus::Alive
    }

    /// Returns `true` for Black-team players.
    #[must_use]
    pub const fn is_black(&self) -> bool {
        self.role.is_black()
    }

    #[must_use]
    pub fn speeches(&self) -> &[SpeechRecord] {
        &self.speeches
    }

    #[must_use]
    pub fn nominations_made(&self) -> &[PlayerId] {
        &self.nominations_made
    }

    #[must_use]
    pub const fn votes_cast(&self) -> &BTreeMap<u32, PlayerId> {
        &self.votes_cast
    }

    /// Full mafia roster, known only to Black-team players.
    #[must_use]
    pub fn known_mafia(&self) -> &[PlayerId] {
        &self.known_mafia
    }

    #[must_use]
    pub const fn sheriff_checks(&self) -> &BTreeMap<u32, SheriffCheck> {
        &self.sheriff_checks
    }

    #[must_use]
    pub const fn don_checks(&self) -> &BTreeMap<u32, DonCheck> {
        &self.don_checks
    }

    #[must_use]
    pub const fn kill_claims(&self) -> &BTreeMap<u32, PlayerId> {
        &self.kill_claims
    }

    #[must_use]
    pub const fn kill_decisions(&self) -> &BTreeMap<u32, PlayerId> {
        &self.kill_decisions
    }

    pub(crate) fn grant_mafia_knowledge(&mut self, roster: Vec<PlayerId>) {
        self.known_mafia = roster;
    }

    pub(crate) fn add_speech(&mut self, day: u32, text: String, closing: bool) {
        self.speeches.push(SpeechRecord { day, text, closing });
    }

    pub(crate) fn record_nomination(&mut self, target: PlayerId) {
        if !self.nominations_made.contains(&target) {
            self.nominations_made.push(target);
        }
    }

    pub(crate) fn record_vote(&mut self, day: u32, target: PlayerId) {
        self.votes_cast.insert(day, target);
    }

    pub(crate) fn record_sheriff_check(&mut self, night: u32, check: SheriffCheck) {
        self.sheriff_checks.insert(night, check);
    }

    pub(crate) fn record_don_check(&mut self, night: u32, check: DonCheck) {
        self.don_checks.insert(night, check);
    }

    pub(crate) fn record_kill_claim(&mut self, night: u32, target: PlayerId) {
        self.kill_claims.insert(night, target);
    }

    pub(crate) fn record_kill_decision(&mut self, night: u32, target: PlayerId) {
        self.kill_decisions.insert(night, target);
    }

    /// Marks the player eliminated. Status never reverts.
    pub(crate) fn eliminate(&mut self) {
        if self.status == PlayerStatus::Alive {
            self.status = PlayerStatus::Eliminated;
        }
    }

    /// Marks the player disqualified. Status never reverts.
    pub fn disqualify(&mut self) {
        if self.status == PlayerStatus::Alive {
            self.status = PlayerStatus::Disqualified;
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {} ({})", self.id, self.role)
    }
}
