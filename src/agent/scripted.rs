//! Seeded scripted decision source.
//!
//! A deterministic stand-in player: it makes legal moves drawn from a
//! per-seat RNG, so a full match can run end to end with no external
//! dependency and replays identically for the same seed.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::error::AgentError;
use crate::state::PlayerId;

use super::{AgentContext, DecisionSource, NightAction, NightRequest, RequestKind};

/// A deterministic player driven by a seeded RNG.
#[derive(Debug)]
pub struct ScriptedAgent {
    id: PlayerId,
    rng: StdRng,
    /// Players this seat has already checked at night.
    checked: BTreeSet<PlayerId>,
    /// day → the target this seat nominated, so votes follow nominations.
    nominated: BTreeMap<u32, PlayerId>,
}

impl ScriptedAgent {
    /// Each seat derives its own RNG stream from the match seed.
    #[must_use]
    pub fn new(id: PlayerId, seed: u64) -> Self {
        Self {
            id,
            rng: StdRng::seed_from_u64(seed.wrapping_add(u64::from(id.get()))),
            checked: BTreeSet::new(),
            nominated: BTreeMap::new(),
        }
    }

    fn pick(&mut self, pool: &[PlayerId]) -> Option<PlayerId> {
        pool.choose(&mut self.rng).copied()
    }

    /// An unchecked living player, falling back to any living other.
    fn check_target(&mut self, ctx: &AgentContext) -> Option<PlayerId> {
        let others = ctx.alive_others();
        let fresh: Vec<PlayerId> = others
            .iter()
            .copied()
            .filter(|id| !self.checked.contains(id))
            .collect();
        let target = if fresh.is_empty() {
            self.pick(&others)
        } else {
            self.pick(&fresh)
        };
        if let Some(t) = target {
            self.checked.insert(t);
        }
        target
    }
}

#[async_trait]
impl DecisionSource for ScriptedAgent {
    async fn speak(&mut self, ctx: &AgentContext) -> Result<String, AgentError> {
        let target = self.pick(&ctx.alive_others()).ok_or_else(|| {
            AgentError::SourceFailure {
                player: self.id,
                action: ctx.request.label().to_owned(),
                message: "no living players to discuss".to_owned(),
            }
        })?;
        self.nominated.insert(ctx.day, target);
        Ok(format!(
            "I am Player {}. I have been watching carefully and I do not trust \
             player {target}. I nominate player number {target}. PASS",
            self.id
        ))
    }

    async fn night_action(&mut self, ctx: &AgentContext) -> Result<NightAction, AgentError> {
        let RequestKind::Night(request) = &ctx.request else {
            return Err(AgentError::SourceFailure {
                player: self.id,
                action: ctx.request.label().to_owned(),
                message: "night action requested outside the night phase".to_owned(),
            });
        };
        let me = self.id;
        let no_target = move || AgentError::SourceFailure {
            player: me,
            action: ctx.request.label().to_owned(),
            message: "no valid target available".to_owned(),
        };
        match request {
            NightRequest::SheriffCheck => {
                let target = self.check_target(ctx).ok_or_else(no_target)?;
                Ok(NightAction::SheriffCheck { target })
            }
            NightRequest::DonCheck => {
                let target = self.check_target(ctx).ok_or_else(no_target)?;
                Ok(NightAction::DonCheck { target })
            }
            NightRequest::KillClaim => {
                let target = self
                    .pick(&ctx.presumed_civilians())
                    .ok_or_else(no_target)?;
                Ok(NightAction::KillClaim { target })
            }
            NightRequest::KillDecision { claims } => {
                // Back the most claimed target; with no claims, pick one.
                let mut tally: BTreeMap<PlayerId, usize> = BTreeMap::new();
                for target in claims.values() {
                    *tally.entry(*target).or_default() += 1;
                }
                let target = tally
                    .into_iter()
                    .max_by_key(|&(_, n)| n)
                    .map(|(t, _)| t)
                    .or_else(|| self.pick(&ctx.presumed_civilians()))
                    .ok_or_else(no_target)?;
                Ok(NightAction::KillDecision { target })
            }
        }
    }

    async fn vote_choice(&mut self, ctx: &AgentContext) -> Result<PlayerId, AgentError> {
        let RequestKind::Vote { nominees } = &ctx.request else {
            return Err(AgentError::SourceFailure {
                player: self.id,
                action: ctx.request.label().to_owned(),
                message: "vote requested outside the voting phase".to_owned(),
            });
        };
        // Stand by today's nomination when it made the ballot.
        if let Some(&own) = self.nominated.get(&ctx.day) {
            if own != self.id && nominees.contains(&own) {
                return Ok(own);
            }
        }
        nominees
            .iter()
            .copied()
            .find(|&n| n != self.id)
            .or_else(|| nominees.first().copied())
            .ok_or_else(|| AgentError::SourceFailure {
                player: self.id,
                action: ctx.request.label().to_owned(),
                message: "ballot is empty".to_owned(),
            })
    }

    async fn final_speech(&mut self, _ctx: &AgentContext) -> Result<String, AgentError> {
        Ok(format!(
            "I am Player {}. The table has decided and I accept it. Watch each \
             other closely after I am gone. THANK YOU",
            self.id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::RoleKind;
    use crate::state::GameState;

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

    #[tokio::test]
    async fn speeches_end_with_a_terminator() {
        let state = GameState::with_roles(fixed_roles(), None, 3);
        let player = state.player(pid(2)).unwrap();
        let mut agent = ScriptedAgent::new(pid(2), 3);
        let ctx = AgentContext::build(&state, player, RequestKind::Speech);
        let speech = agent.speak(&ctx).await.unwrap();
        assert!(speech.trim_end().ends_with("PASS"));
        // The speech nominates someone other than the speaker.
        let target = crate::judge::Judge::parse_nomination(&speech).unwrap();
        assert_ne!(target, 2);
    }

    #[tokio::test]
    async fn same_seed_same_decisions() {
        let state = GameState::with_roles(fixed_roles(), None, 9);
        let player = state.player(pid(4)).unwrap();
        let ctx = AgentContext::build(&state, player, RequestKind::Speech);
        let mut a = ScriptedAgent::new(pid(4), 9);
        let mut b = ScriptedAgent::new(pid(4), 9);
        assert_eq!(a.speak(&ctx).await.unwrap(), b.speak(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn kill_claim_avoids_known_mafia() {
        let state = GameState::with_roles(fixed_roles(), None, 5);
        let don = state.player(pid(10)).unwrap();
        let mut agent = ScriptedAgent::new(pid(10), 5);
        let ctx =
            AgentContext::build(&state, don, RequestKind::Night(NightRequest::KillClaim));
        for _ in 0..20 {
            let action = agent.night_action(&ctx).await.unwrap();
            let NightAction::KillClaim { target } = action else {
                panic!("expected a kill claim, got {action:?}");
            };
            assert!(![pid(8), pid(9), pid(10)].contains(&target));
        }
    }

    #[tokio::test]
    async fn kill_decision_backs_the_majority_claim() {
        let state = GameState::with_roles(fixed_roles(), None, 5);
        let don = state.player(pid(10)).unwrap();
        let mut agent = ScriptedAgent::new(pid(10), 5);
        let claims: BTreeMap<PlayerId, PlayerId> = [
            (pid(8), pid(3)),
            (pid(9), pid(3)),
            (pid(10), pid(1)),
        ]
        .into();
        let ctx = AgentContext::build(
            &state,
            don,
            RequestKind::Night(NightRequest::KillDecision { claims }),
        );
        let action = agent.night_action(&ctx).await.unwrap();
        assert_eq!(action, NightAction::KillDecision { target: pid(3) });
    }

    #[tokio::test]
    async fn kill_decision_with_no_claims_still_picks() {
        let state = GameState::with_roles(fixed_roles(), None, 5);
        let don = state.player(pid(10)).unwrap();
        let mut agent = ScriptedAgent::new(pid(10), 5);
        let ctx = AgentContext::build(
            &state,
            don,
            RequestKind::Night(NightRequest::KillDecision {
                claims: BTreeMap::new(),
            }),
        );
        let action = agent.night_action(&ctx).await.unwrap();
        assert!(matches!(action, NightAction::KillDecision { .. }));
    }

    #[tokio::test]
    async fn vote_follows_own_nomination() {
        let state = GameState::with_roles(fixed_roles(), None, 11);
        let player = state.player(pid(1)).unwrap();
        let mut agent = ScriptedAgent::new(pid(1), 11);
        let speech_ctx = AgentContext::build(&state, player, RequestKind::Speech);
        let speech = agent.speak(&speech_ctx).await.unwrap();
        let own = crate::judge::Judge::parse_nomination(&speech).unwrap();
        let own = PlayerId::new(u8::try_from(own).unwrap()).unwrap();

        let vote_ctx = AgentContext::build(
            &state,
            player,
            RequestKind::Vote {
                nominees: vec![own, pid(6)],
            },
        );
        assert_eq!(agent.vote_choice(&vote_ctx).await.unwrap(), own);
    }

    #[tokio::test]
    async fn final_speech_ends_with_thank_you() {
        let state = GameState::with_roles(fixed_roles(), None, 2);
        let player = state.player(pid(5)).unwrap();
        let mut agent = ScriptedAgent::new(pid(5), 2);
        let ctx = AgentContext::build(&state, player, RequestKind::FinalSpeech);
        let speech = agent.final_speech(&ctx).await.unwrap();
        assert!(speech.trim_end().ends_with("THANK YOU"));
    }
}
