//! The decision-source boundary.
//!
//! Every choice a player makes goes through [`DecisionSource`]. The engine
//! builds an [`AgentContext`] restricted to what that player may legally
//! know (public history plus their own role-private ledgers) and asks the
//! source for a decision. Sources never see the state directly.

pub mod scripted;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::config::{AgentKind, GameConfig};
use crate::error::AgentError;
use crate::state::{ActionRecord, GameState, Phase, Player, PlayerId};

pub use scripted::ScriptedAgent;

/// Which night decision is being requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NightRequest {
    /// Sheriff: pick a player to learn their team.
    SheriffCheck,
    /// Mafioso: claim a kill target for the table.
    KillClaim,
    /// Decider: pick the binding kill from the collected claims.
    /// Claims are keyed by the mafioso who made them and may be empty.
    KillDecision { claims: BTreeMap<PlayerId, PlayerId> },
    /// Don: pick a player to learn whether they are the Sheriff.
    DonCheck,
}

/// What the engine is asking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// A day speech, terminator expected.
    Speech,
    /// A closing statement after elimination.
    FinalSpeech,
    /// A vote over the listed nominees.
    Vote { nominees: Vec<PlayerId> },
    /// A night action.
    Night(NightRequest),
}

impl RequestKind {
    /// Short label for logs and error messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Speech => "speech",
            Self::FinalSpeech => "final_speech",
            Self::Vote { .. } => "vote",
            Self::Night(NightRequest::SheriffCheck) => "sheriff_check",
            Self::Night(NightRequest::KillClaim) => "kill_claim",
            Self::Night(NightRequest::KillDecision { .. }) => "kill_decision",
            Self::Night(NightRequest::DonCheck) => "don_check",
        }
    }
}

/// A night decision returned by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightAction {
    SheriffCheck { target: PlayerId },
    KillClaim { target: PlayerId },
    KillDecision { target: PlayerId },
    DonCheck { target: PlayerId },
    /// Decline to act. Only valid where the protocol allows it.
    Pass,
}

/// Everything a decision source may know when making one decision.
///
/// The player's own record carries their private ledgers; the history is
/// the public action log only.
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// The deciding player's full record, private ledgers included.
    pub player: Player,
    /// Living players in seat order.
    pub alive: Vec<PlayerId>,
    pub phase: Phase,
    pub day: u32,
    pub night: u32,
    /// Public action log up to this moment.
    pub public_history: Vec<ActionRecord>,
    /// What is being asked.
    pub request: RequestKind,
}

impl AgentContext {
    /// Builds the context handed to `player`'s source for `request`.
    #[must_use]
    pub fn build(state: &GameState, player: &Player, request: RequestKind) -> Self {
        Self {
            player: player.clone(),
            alive: state.alive_ids(),
            phase: state.phase(),
            day: state.day(),
            night: state.night(),
            public_history: state.log().to_vec(),
            request,
        }
    }

    /// Living players other than the decider.
    #[must_use]
    pub fn alive_others(&self) -> Vec<PlayerId> {
        self.alive
            .iter()
            .copied()
            .filter(|&id| id != self.player.id())
            .collect()
    }

    /// Living players the decider does not know to be mafia. For a
    /// Red-team player this is simply everyone else alive.
    #[must_use]
    pub fn presumed_civilians(&self) -> Vec<PlayerId> {
        self.alive
            .iter()
            .copied()
            .filter(|id| !self.player.known_mafia().contains(id))
            .collect()
    }
}

/// One player's decision maker.
///
/// `&mut self` so sources can keep per-player memory (an RNG, a scratch
/// model of the table) across calls.
#[async_trait]
pub trait DecisionSource: Send {
    /// Produce a day speech.
    async fn speak(&mut self, ctx: &AgentContext) -> Result<String, AgentError>;

    /// Produce a night action matching the request in `ctx`.
    async fn night_action(&mut self, ctx: &AgentContext) -> Result<NightAction, AgentError>;

    /// Choose a nominee to vote against.
    async fn vote_choice(&mut self, ctx: &AgentContext) -> Result<PlayerId, AgentError>;

    /// Produce a closing statement after elimination.
    async fn final_speech(&mut self, ctx: &AgentContext) -> Result<String, AgentError>;
}

/// All ten decision sources, keyed by seat.
pub type AgentPool = BTreeMap<PlayerId, Box<dyn DecisionSource>>;

/// Builds one source per player according to the configured kind.
#[must_use]
pub fn build_pool(state: &GameState, config: &GameConfig) -> AgentPool {
    state
        .players()
        .iter()
        .map(|player| {
            let source: Box<dyn DecisionSource> = match config.agent {
                AgentKind::Scripted => {
                    Box::new(ScriptedAgent::new(player.id(), state.seed()))
                }
            };
            (player.id(), source)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::RoleKind;

    fn fixed_roles() -> [RoleKind; 10] {
        [
            RoleKind::Civilian,
            RoleKind::Civilian,
            RoleKind::Civilian,
            RoleKind::Civilian,
            RoleKind::Civilian,
            RoleKind::Civilian,
            RoleKind::Sheriff,
            RoleKind::Mafia,
            RoleKind::Mafia,
            RoleKind::Don,
        ]
    }

    fn pid(n: u8) -> PlayerId {
        PlayerId::new(n).unwrap()
    }

    #[test]
    fn context_excludes_self_from_others() {
        let state = GameState::with_roles(fixed_roles(), None, 1);
        let player = state.player(pid(3)).unwrap();
        let ctx = AgentContext::build(&state, player, RequestKind::Speech);
        assert_eq!(ctx.alive.len(), 10);
        assert_eq!(ctx.alive_others().len(), 9);
        assert!(!ctx.alive_others().contains(&pid(3)));
    }

    #[test]
    fn mafia_presume_only_red_players_civilian() {
        let state = GameState::with_roles(fixed_roles(), None, 1);
        let don = state.player(pid(10)).unwrap();
        let ctx = AgentContext::build(&state, don, RequestKind::Night(NightRequest::KillClaim));
        let presumed = ctx.presumed_civilians();
        assert_eq!(presumed.len(), 7);
        assert!(!presumed.contains(&pid(8)));
        assert!(!presumed.contains(&pid(9)));
        assert!(!presumed.contains(&pid(10)));
    }

    #[test]
    fn request_labels() {
        assert_eq!(RequestKind::Speech.label(), "speech");
        assert_eq!(
            RequestKind::Night(NightRequest::KillDecision {
                claims: BTreeMap::new()
            })
            .label(),
            "kill_decision"
        );
        assert_eq!(RequestKind::Vote { nominees: vec![] }.label(), "vote");
    }
}
