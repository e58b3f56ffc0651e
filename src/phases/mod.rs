//! Phase controllers: day, voting, and night.
//!
//! Each controller drives one phase of the match against the shared
//! [`GameState`](crate::state::GameState), asking the decision sources for
//! moves and letting the [`Judge`](crate::judge::Judge) rule on them.

pub mod day;
pub mod night;
pub mod voting;

pub use day::DayPhase;
pub use night::NightPhase;
pub use voting::VotingPhase;

use chrono::Utc;

use crate::agent::{AgentContext, AgentPool, RequestKind};
use crate::error::AgentError;
use crate::judge::Judge;
use crate::observability::{Event, EventEmitter};
use crate::state::{EliminationReason, GameState, PlayerId};

/// Asks an eliminated player for their closing statement and records it.
/// Skipped when the elimination ended the match.
///
/// An empty response here is fatal like any other decision failure.
pub(crate) async fn collect_final_speech(
    state: &mut GameState,
    judge: &mut Judge,
    agents: &mut AgentPool,
    emitter: &EventEmitter,
    id: PlayerId,
) -> Result<(), AgentError> {
    if state.phase().is_terminal() {
        return Ok(());
    }
    judge.announce(
        state,
        format!("Player {id} has been eliminated. This is your final speech."),
    );
    let Some(player) = state.player(id) else {
        return Ok(());
    };
    let ctx = AgentContext::build(state, player, RequestKind::FinalSpeech);
    let Some(agent) = agents.get_mut(&id) else {
        return Ok(());
    };
    let text = agent.final_speech(&ctx).await?;
    if text.trim().is_empty() {
        return Err(AgentError::EmptyResponse {
            player: id,
            action: ctx.request.label().to_owned(),
        });
    }
    let text = Judge::repair_speech(&text);
    state.record_speech(id, text.clone(), true);
    emitter.emit(Event::Speech {
        timestamp: Utc::now(),
        player: id,
        day: state.day(),
        text,
        closing: true,
    });
    Ok(())
}

/// Applies an elimination and, when it sticks, publishes the elimination
/// and a fresh state snapshot on the event stream.
pub(crate) fn eliminate_and_emit(
    state: &mut GameState,
    emitter: &EventEmitter,
    id: PlayerId,
    reason: EliminationReason,
    voters: &[PlayerId],
) -> bool {
    let applied = state.eliminate(id, reason, voters);
    if applied {
        let (day, night) = match reason {
            EliminationReason::NightKill => (None, Some(state.night())),
            _ => (Some(state.day()), None),
        };
        emitter.emit(Event::Elimination {
            timestamp: Utc::now(),
            player: id,
            reason,
            day,
            night,
            voters: voters.to_vec(),
        });
        emitter.emit(Event::StateSnapshot {
            timestamp: Utc::now(),
            summary: state.summary(),
        });
    }
    applied
}
