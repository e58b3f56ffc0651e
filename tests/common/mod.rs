//! Shared fixtures for integration tests: a known role layout and a
//! closure-driven stub decision source.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;

use mafiasim::agent::{
    AgentContext, AgentPool, DecisionSource, NightAction, NightRequest, RequestKind,
};
use mafiasim::error::AgentError;
use mafiasim::game::Game;
use mafiasim::observability::EventEmitter;
use mafiasim::roles::RoleKind;
use mafiasim::state::{GameState, PlayerId};

pub fn pid(n: u8) -> PlayerId {
    PlayerId::new(n).expect("test seat in range")
}

/// Seats 1-6 civilians, 7 sheriff, 8-9 mafia, 10 don.
pub fn fixed_roles() -> [RoleKind; 10] {
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

pub fn fixed_state(max_rounds: Option<u32>) -> GameState {
    GameState::with_roles(fixed_roles(), max_rounds, 1)
}

type SpeechFn = Box<dyn FnMut(&AgentContext) -> Result<String, AgentError> + Send>;
type NightFn = Box<dyn FnMut(&AgentContext) -> Result<NightAction, AgentError> + Send>;
type VoteFn = Box<dyn FnMut(&AgentContext) -> Result<PlayerId, AgentError> + Send>;

/// A decision source driven entirely by per-test closures. Unset closures
/// fall back to quiet legal behavior: a no-nomination speech, the first
/// legal night target, a vote for the first non-self nominee.
pub struct StubAgent {
    speech: Option<SpeechFn>,
    night: Option<NightFn>,
    vote: Option<VoteFn>,
    farewell: Option<SpeechFn>,
}

impl StubAgent {
    pub fn new() -> Self {
        Self {
            speech: None,
            night: None,
            vote: None,
            farewell: None,
        }
    }

    pub fn with_speech(
        mut self,
        f: impl FnMut(&AgentContext) -> Result<String, AgentError> + Send + 'static,
    ) -> Self {
        self.speech = Some(Box::new(f));
        self
    }

    pub fn with_night(
        mut self,
        f: impl FnMut(&AgentContext) -> Result<NightAction, AgentError> + Send + 'static,
    ) -> Self {
        self.night = Some(Box::new(f));
        self
    }

    pub fn with_vote(
        mut self,
        f: impl FnMut(&AgentContext) -> Result<PlayerId, AgentError> + Send + 'static,
    ) -> Self {
        self.vote = Some(Box::new(f));
        self
    }

    pub fn with_farewell(
        mut self,
        f: impl FnMut(&AgentContext) -> Result<String, AgentError> + Send + 'static,
    ) -> Self {
        self.farewell = Some(Box::new(f));
        self
    }

    /// A fixed speech regardless of context.
    pub fn saying(text: &str) -> Self {
        let text = text.to_owned();
        Self::new().with_speech(move |_| Ok(text.clone()))
    }

    fn default_night(ctx: &AgentContext) -> Result<NightAction, AgentError> {
        let me = ctx.player.id();
        let fail = || AgentError::SourceFailure {
            player: me,
            action: ctx.request.label().to_owned(),
            message: "no target available".to_owned(),
        };
        match &ctx.request {
            RequestKind::Night(NightRequest::SheriffCheck) => {
                let target = ctx.alive_others().first().copied().ok_or_else(fail)?;
                Ok(NightAction::SheriffCheck { target })
            }
            RequestKind::Night(NightRequest::DonCheck) => {
                let target = ctx.alive_others().first().copied().ok_or_else(fail)?;
                Ok(NightAction::DonCheck { target })
            }
            RequestKind::Night(NightRequest::KillClaim) => {
                let target = ctx
                    .presumed_civilians()
                    .first()
                    .copied()
                    .ok_or_else(fail)?;
                Ok(NightAction::KillClaim { target })
            }
            RequestKind::Night(NightRequest::KillDecision { claims }) => {
                let target = claims
                    .values()
                    .next()
                    .copied()
                    .or_else(|| ctx.presumed_civilians().first().copied())
                    .ok_or_else(fail)?;
                Ok(NightAction::KillDecision { target })
            }
            _ => Err(fail()),
        }
    }
}

impl Default for StubAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionSource for StubAgent {
    async fn speak(&mut self, ctx: &AgentContext) -> Result<String, AgentError> {
        match &mut self.speech {
            Some(f) => f(ctx),
            None => Ok(format!(
                "I am Player {}. I have nothing to report today. PASS",
                ctx.player.id()
            )),
        }
    }

    async fn night_action(&mut self, ctx: &AgentContext) -> Result<NightAction, AgentError> {
        match &mut self.night {
            Some(f) => f(ctx),
            None => Self::default_night(ctx),
        }
    }

    async fn vote_choice(&mut self, ctx: &AgentContext) -> Result<PlayerId, AgentError> {
        match &mut self.vote {
            Some(f) => f(ctx),
            None => {
                let RequestKind::Vote { nominees } = &ctx.request else {
                    return Err(AgentError::SourceFailure {
                        player: ctx.player.id(),
                        action: ctx.request.label().to_owned(),
                        message: "vote requested outside voting".to_owned(),
                    });
                };
                nominees
                    .iter()
                    .copied()
                    .find(|&n| n != ctx.player.id())
                    .or_else(|| nominees.first().copied())
                    .ok_or_else(|| AgentError::SourceFailure {
                        player: ctx.player.id(),
                        action: ctx.request.label().to_owned(),
                        message: "empty ballot".to_owned(),
                    })
            }
        }
    }

    async fn final_speech(&mut self, ctx: &AgentContext) -> Result<String, AgentError> {
        match &mut self.farewell {
            Some(f) => f(ctx),
            None => Ok(format!("I am Player {}. Good luck. THANK YOU", ctx.player.id())),
        }
    }
}

/// A pool of quiet default stubs for every seat.
pub fn stub_pool(state: &GameState) -> AgentPool {
    state
        .players()
        .iter()
        .map(|p| {
            let source: Box<dyn DecisionSource> = Box::new(StubAgent::new());
            (p.id(), source)
        })
        .collect()
}

/// A full game over the fixed layout with a stub pool, events discarded.
pub fn stub_game(max_rounds: Option<u32>) -> Game {
    let state = fixed_state(max_rounds);
    let agents = stub_pool(&state);
    Game::with_parts(state, agents, Arc::new(EventEmitter::noop()), false)
}
