//! Night phase: the Sheriff check, the mafia kill protocol, and the Don
//! check, in that order.
//!
//! Night actions are mandatory for the roles that hold them. A role that
//! was awake all night without acting is a rules violation that aborts
//! the match, unless the game already ended mid-night.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::agent::{AgentContext, AgentPool, NightAction, NightRequest, RequestKind};
use crate::error::{FatalError, NightViolation};
use crate::judge::Judge;
use crate::observability::{Event, EventEmitter};
use crate::roles::RoleKind;
use crate::state::{DonCheck, EliminationReason, GameState, Phase, PlayerId, SheriffCheck};

use super::{collect_final_speech, eliminate_and_emit};

/// Runs one night.
#[derive(Debug)]
pub struct NightPhase {
    emitter: Arc<EventEmitter>,
}

impl NightPhase {
    #[must_use]
    pub fn new(emitter: Arc<EventEmitter>) -> Self {
        Self { emitter }
    }

    /// # Errors
    ///
    /// Returns [`FatalError`] when a decision source fails or a mandatory
    /// night action was skipped.
    pub async fn run(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
    ) -> Result<(), FatalError> {
        judge.announce(state, "Night falls. The city goes to sleep.");

        // Roles as of nightfall; the kill can change who is alive before
        // the night is over.
        let sheriff = state.sheriff_alive();
        let don = state.don_alive();
        let mafia = state.mafia_alive();

        let sheriff_acted = match sheriff {
            Some(id) => self.sheriff_check(state, judge, agents, id).await?,
            None => false,
        };

        let claims = self.collect_kill_claims(state, judge, agents, &mafia).await?;
        let victim = self.decide_kill(state, agents, don, &mafia, &claims).await?;
        if let Some(victim) = victim {
            if eliminate_and_emit(
                state,
                &self.emitter,
                victim,
                EliminationReason::NightKill,
                &[],
            ) {
                judge.announce(state, format!("Player {victim} has been killed tonight."));
                collect_final_speech(state, judge, agents, &self.emitter, victim).await?;
            }
        } else {
            judge.announce(state, "The mafia leaves without a kill.");
        }
        if state.phase().is_terminal() {
            return Ok(());
        }

        let don_acted = match don.filter(|&id| state.is_valid_target(id)) {
            Some(id) => self.don_check(state, judge, agents, id).await?,
            None => false,
        };

        if state.phase() != Phase::Night {
            return Ok(());
        }
        let mut violations = Vec::new();
        if let Some(id) = don.filter(|&id| state.is_valid_target(id)) {
            if !don_acted {
                violations.push(NightViolation {
                    role: RoleKind::Don,
                    player: id,
                });
            }
        }
        for &id in &mafia {
            if state.is_valid_target(id) && !claims.contains_key(&id) {
                let role = state.player(id).map_or(RoleKind::Mafia, |p| p.role());
                violations.push(NightViolation { role, player: id });
            }
        }
        // The binding kill decision is mandatory while any mafioso lives.
        let mafia_remaining = mafia.iter().any(|&id| state.is_valid_target(id));
        if mafia_remaining && victim.is_none() {
            let decider = don.filter(|&id| state.is_valid_target(id)).or_else(|| {
                mafia.iter().copied().find(|&id| {
                    state.is_valid_target(id)
                        && state.player(id).is_some_and(|p| p.role() == RoleKind::Mafia)
                })
            });
            if let Some(id) = decider {
                let role = state.player(id).map_or(RoleKind::Don, |p| p.role());
                violations.push(NightViolation { role, player: id });
            }
        }
        if let Some(id) = sheriff.filter(|&id| state.is_valid_target(id)) {
            if !sheriff_acted {
                violations.push(NightViolation {
                    role: RoleKind::Sheriff,
                    player: id,
                });
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(FatalError::NightValidation(violations))
        }
    }

    /// Returns `true` when the Sheriff performed a valid check.
    async fn sheriff_check(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
        sheriff: PlayerId,
    ) -> Result<bool, FatalError> {
        judge.announce(state, "The Sheriff wakes up, you have ten seconds.");
        let Some(player) = state.player(sheriff) else {
            return Ok(false);
        };
        let ctx = AgentContext::build(state, player, RequestKind::Night(NightRequest::SheriffCheck));
        let Some(agent) = agents.get_mut(&sheriff) else {
            return Ok(false);
        };
        let action = agent.night_action(&ctx).await.map_err(FatalError::Agent)?;
        let NightAction::SheriffCheck { target } = action else {
            tracing::warn!(target: "night", %sheriff, ?action, "sheriff returned a non-check action");
            return Ok(false);
        };
        if !state.is_valid_target(target) {
            tracing::warn!(target: "night", %sheriff, %target, "sheriff checked an invalid target");
            return Ok(false);
        }
        let Some(team) = state.player(target).map(|p| p.role().team()) else {
            return Ok(false);
        };
        let night = state.night();
        if let Some(p) = state.player_mut(sheriff) {
            p.record_sheriff_check(night, SheriffCheck { target, team });
        }
        self.emitter.emit(Event::SheriffCheck {
            timestamp: Utc::now(),
            target,
            result: team,
            night,
        });
        judge.announce(state, format!("Player {target} is {team}."));
        judge.announce(state, "The Sheriff goes to sleep.");
        Ok(true)
    }

    /// Collects a kill claim from every living mafioso, Don included.
    /// Claims are public within the mafia and are passed on verbatim to
    /// the decider, even when the map stays empty.
    async fn collect_kill_claims(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
        mafia: &[PlayerId],
    ) -> Result<BTreeMap<PlayerId, PlayerId>, FatalError> {
        if mafia.is_empty() {
            return Ok(BTreeMap::new());
        }
        judge.announce(state, "The mafia wakes up and goes hunting.");
        let mut claims = BTreeMap::new();
        for &mafioso in mafia {
            if !state.is_valid_target(mafioso) {
                continue;
            }
            let Some(player) = state.player(mafioso) else {
                continue;
            };
            let ctx =
                AgentContext::build(state, player, RequestKind::Night(NightRequest::KillClaim));
            let Some(agent) = agents.get_mut(&mafioso) else {
                continue;
            };
            let action = agent.night_action(&ctx).await.map_err(FatalError::Agent)?;
            let NightAction::KillClaim { target } = action else {
                tracing::warn!(target: "night", %mafioso, ?action, "mafioso skipped the kill claim");
                continue;
            };
            if !state.is_valid_target(target) {
                tracing::warn!(target: "night", %mafioso, %target, "kill claim on an invalid target");
                continue;
            }
            let night = state.night();
            if let Some(p) = state.player_mut(mafioso) {
                p.record_kill_claim(night, target);
            }
            self.emitter.emit(Event::KillClaim {
                timestamp: Utc::now(),
                mafia: mafioso,
                target,
                night,
            });
            claims.insert(mafioso, target);
        }
        Ok(claims)
    }

    /// Asks the decider for the binding kill. The Don decides when alive;
    /// otherwise the lowest-seated living non-Don mafioso does.
    async fn decide_kill(
        &self,
        state: &mut GameState,
        agents: &mut AgentPool,
        don: Option<PlayerId>,
        mafia: &[PlayerId],
        claims: &BTreeMap<PlayerId, PlayerId>,
    ) -> Result<Option<PlayerId>, FatalError> {
        let decider = don.filter(|&id| state.is_valid_target(id)).or_else(|| {
            mafia
                .iter()
                .copied()
                .find(|&id| state.is_valid_target(id) && state.player(id).is_some_and(|p| p.role() == RoleKind::Mafia))
        });
        let Some(decider) = decider else {
            state.record_night_kill(None);
            return Ok(None);
        };
        let is_don = state.player(decider).is_some_and(|p| p.role() == RoleKind::Don);

        let Some(player) = state.player(decider) else {
            state.record_night_kill(None);
            return Ok(None);
        };
        let ctx = AgentContext::build(
            state,
            player,
            RequestKind::Night(NightRequest::KillDecision {
                claims: claims.clone(),
            }),
        );
        let Some(agent) = agents.get_mut(&decider) else {
            state.record_night_kill(None);
            return Ok(None);
        };
        let action = agent.night_action(&ctx).await.map_err(FatalError::Agent)?;
        let NightAction::KillDecision { target } = action else {
            tracing::warn!(target: "night", %decider, ?action, "decider returned no kill decision");
            state.record_night_kill(None);
            return Ok(None);
        };
        if !state.is_valid_target(target) {
            tracing::warn!(target: "night", %decider, %target, "kill decision on an invalid target");
            state.record_night_kill(None);
            return Ok(None);
        }
        let night = state.night();
        if let Some(p) = state.player_mut(decider) {
            p.record_kill_decision(night, target);
        }
        self.emitter.emit(Event::KillDecision {
            timestamp: Utc::now(),
            decider,
            target,
            night,
            is_don,
        });
        state.record_night_kill(Some(target));
        Ok(Some(target))
    }

    /// Returns `true` when the Don performed a valid check.
    async fn don_check(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
        don: PlayerId,
    ) -> Result<bool, FatalError> {
        judge.announce(state, "The Don wakes up, you have ten seconds.");
        let Some(player) = state.player(don) else {
            return Ok(false);
        };
        let ctx = AgentContext::build(state, player, RequestKind::Night(NightRequest::DonCheck));
        let Some(agent) = agents.get_mut(&don) else {
            return Ok(false);
        };
        let action = agent.night_action(&ctx).await.map_err(FatalError::Agent)?;
        let NightAction::DonCheck { target } = action else {
            tracing::warn!(target: "night", %don, ?action, "don returned a non-check action");
            return Ok(false);
        };
        if !state.is_valid_target(target) {
            tracing::warn!(target: "night", %don, %target, "don checked an invalid target");
            return Ok(false);
        }
        let is_sheriff = state
            .player(target)
            .is_some_and(|p| p.role() == RoleKind::Sheriff);
        let night = state.night();
        if let Some(p) = state.player_mut(don) {
            p.record_don_check(night, DonCheck { target, is_sheriff });
        }
        self.emitter.emit(Event::DonCheck {
            timestamp: Utc::now(),
            target,
            is_sheriff,
            night,
        });
        if is_sheriff {
            judge.announce(state, format!("Player {target} is the Sheriff."));
        } else {
            judge.announce(state, format!("Player {target} is not the Sheriff."));
        }
        judge.announce(state, "The Don goes to sleep.");
        Ok(true)
    }
}
