//! Day phase: speeches and nominations.

use std::sync::Arc;

use chrono::Utc;

use crate::agent::{AgentContext, AgentPool, RequestKind};
use crate::error::{AgentError, FatalError};
use crate::judge::{Judge, NominationOutcome, RejectReason};
use crate::observability::{Event, EventEmitter};
use crate::state::{EliminationReason, GameState, PlayerId, id_list};

use super::{collect_final_speech, eliminate_and_emit};

/// Runs one day: the speaking round, nomination rulings, and the
/// end-of-day decision on whether the table votes.
#[derive(Debug)]
pub struct DayPhase {
    emitter: Arc<EventEmitter>,
}

impl DayPhase {
    #[must_use]
    pub fn new(emitter: Arc<EventEmitter>) -> Self {
        Self { emitter }
    }

    /// Living players in seat order, rotated so each day opens one seat
    /// past the previous day's opener.
    #[must_use]
    pub fn speaking_order(state: &GameState) -> Vec<PlayerId> {
        let alive = state.alive_ids();
        if alive.is_empty() {
            return alive;
        }
        let start = match state.last_day_starter() {
            None => alive
                .iter()
                .position(|&id| id == PlayerId::FIRST)
                .unwrap_or(0),
            // First living seat past the previous opener, wrapping to the
            // lowest seat.
            Some(prev) => alive.iter().position(|&id| id > prev).unwrap_or(0),
        };
        let mut order = alive;
        order.rotate_left(start);
        order
    }

    /// # Errors
    ///
    /// Returns [`FatalError`] when any decision source fails; the match
    /// cannot continue past a failed speech.
    pub async fn run(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
    ) -> Result<(), FatalError> {
        judge.announce(
            state,
            format!(
                "Morning has come (in the city). Players alive: {}",
                id_list(&state.alive_ids())
            ),
        );

        let order = Self::speaking_order(state);
        if let Some(&opener) = order.first() {
            state.set_last_day_starter(opener);
        }

        for speaker in order {
            if !state.is_valid_target(speaker) {
                continue;
            }
            self.hear_speech(state, judge, agents, speaker).await?;
        }

        self.close_day(state, judge, agents).await
    }

    async fn hear_speech(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
        speaker: PlayerId,
    ) -> Result<(), FatalError> {
        judge.announce(state, format!("Player {speaker}, you have 60 seconds to speak."));
        let Some(player) = state.player(speaker) else {
            return Ok(());
        };
        let ctx = AgentContext::build(state, player, RequestKind::Speech);
        let Some(agent) = agents.get_mut(&speaker) else {
            return Ok(());
        };
        let text = agent.speak(&ctx).await.map_err(FatalError::Agent)?;
        if text.trim().is_empty() {
            return Err(AgentError::EmptyResponse {
                player: speaker,
                action: ctx.request.label().to_owned(),
            }
            .into());
        }
        let text = Judge::repair_speech(&text);
        state.record_speech(speaker, text.clone(), false);
        self.emitter.emit(Event::Speech {
            timestamp: Utc::now(),
            player: speaker,
            day: state.day(),
            text: text.clone(),
            closing: false,
        });

        match judge.process_nomination(state, speaker, &text) {
            NominationOutcome::Accepted { target } => {
                self.emitter.emit(Event::Nomination {
                    timestamp: Utc::now(),
                    nominator: speaker,
                    target,
                    day: state.day(),
                    accepted: true,
                    reason: None,
                });
                judge.announce(
                    state,
                    format!("Accepted. Player {target} has been nominated by Player {speaker}."),
                );
            }
            NominationOutcome::Rejected { reason } => {
                if let RejectReason::AlreadyNominated {
                    target,
                    first_nominator,
                } = reason
                {
                    self.emitter.emit(Event::Nomination {
                        timestamp: Utc::now(),
                        nominator: speaker,
                        target,
                        day: state.day(),
                        accepted: false,
                        reason: Some(reason.to_string()),
                    });
                    let by = first_nominator
                        .map_or_else(|| "another player".to_owned(), |p| format!("Player {p}"));
                    judge.announce(
                        state,
                        format!("Rejected. Player {target} is already nominated by {by}."),
                    );
                } else {
                    tracing::debug!(target: "judge", %speaker, %reason, "nomination rejected");
                }
            }
            NominationOutcome::NoNomination => {}
        }
        Ok(())
    }

    /// Decides how the day ends: no vote, an unopposed elimination, or a
    /// transition into the voting stage.
    async fn close_day(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
    ) -> Result<(), FatalError> {
        let nominees = judge.nominated(state);
        match nominees.as_slice() {
            [] => {
                judge.announce(state, "No one has been nominated today. The city goes to sleep.");
                state.start_night();
            }
            [_] if state.day() == 1 => {
                judge.announce(
                    state,
                    "Only one player was nominated on the first day. No vote is held.",
                );
                state.start_night();
            }
            &[target] => {
                judge.announce(
                    state,
                    format!("Only player {target} was nominated. The table is unanimous."),
                );
                let voters: Vec<PlayerId> = state
                    .alive_ids()
                    .into_iter()
                    .filter(|&id| id != target)
                    .collect();
                if eliminate_and_emit(
                    state,
                    &self.emitter,
                    target,
                    EliminationReason::UnanimousNomination,
                    &voters,
                ) {
                    collect_final_speech(state, judge, agents, &self.emitter, target).await?;
                }
                if !state.phase().is_terminal() {
                    state.start_night();
                }
            }
            _ => {
                state.start_voting();
            }
        }
        Ok(())
    }
}
