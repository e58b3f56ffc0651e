//! Voting phase: concurrent ballot collection and tie-breaking.
//!
//! Votes are gathered concurrently from every living player and only then
//! applied to the state, so no voter can react to another ballot from the
//! same round. Ties run a bounded resolution loop: extra speeches and a
//! revote over the tied set, falling back to an eliminate-all vote when
//! the same tie persists.

use std::sync::Arc;

use chrono::Utc;

use crate::agent::{AgentContext, AgentPool, RequestKind};
use crate::error::{AgentError, FatalError};
use crate::judge::Judge;
use crate::observability::{Event, EventEmitter, TallyLine};
use crate::state::{EliminationReason, GameState, PlayerId, id_list};

use super::{collect_final_speech, eliminate_and_emit};

/// Runs the voting stage of a day.
#[derive(Debug)]
pub struct VotingPhase {
    emitter: Arc<EventEmitter>,
}

impl VotingPhase {
    #[must_use]
    pub fn new(emitter: Arc<EventEmitter>) -> Self {
        Self { emitter }
    }

    /// # Errors
    ///
    /// Returns [`FatalError`] when any decision source fails mid-ballot.
    pub async fn run(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
    ) -> Result<(), FatalError> {
        judge.announce(state, "It is voting time.");
        match self.vote_round(state, judge, agents).await? {
            Some(target) => {
                let voters = judge.voters_for(state, target);
                if eliminate_and_emit(
                    state,
                    &self.emitter,
                    target,
                    EliminationReason::Voting,
                    &voters,
                ) {
                    collect_final_speech(state, judge, agents, &self.emitter, target).await?;
                }
                Ok(())
            }
            None => {
                let tied = judge.tied_players(state);
                self.break_tie(state, judge, agents, tied).await
            }
        }
    }

    /// One complete vote round over the current ballot: announcements,
    /// concurrent collection, tallies. Returns the unique leader, or
    /// `None` on a tie.
    async fn vote_round(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
    ) -> Result<Option<PlayerId>, FatalError> {
        let nominees = judge.nominated(state);
        self.emitter.emit(Event::VotingStarted {
            timestamp: Utc::now(),
            nominees: nominees.clone(),
            day: state.day(),
        });
        judge.announce(
            state,
            format!(
                "Players {} have been nominated. I repeat, {}, in this order.",
                id_list(&nominees),
                id_list(&nominees)
            ),
        );
        judge.announce(
            state,
            "You must vote. If you do not vote, your vote will count for the last person nominated.",
        );

        let ballots = self.fan_out_votes(state, agents, &nominees).await?;
        for (voter, choice) in ballots {
            // A self-vote is redirected to the first other nominee.
            let choice = if choice == voter {
                match nominees.iter().copied().find(|&n| n != voter) {
                    Some(other) => other,
                    None => continue,
                }
            } else {
                choice
            };
            if judge.process_vote(state, voter, choice) {
                self.emitter.emit(Event::VoteCast {
                    timestamp: Utc::now(),
                    voter,
                    target: choice,
                    day: state.day(),
                });
            }
        }

        let counts = judge.vote_counts(state);
        for (target, voters) in &counts {
            judge.announce(
                state,
                format!(
                    "{} votes for player {target}, voted: {}",
                    voters.len(),
                    id_list(voters)
                ),
            );
        }
        self.emitter.emit(Event::VoteResults {
            timestamp: Utc::now(),
            day: state.day(),
            tallies: counts
                .iter()
                .map(|(target, voters)| TallyLine {
                    target: *target,
                    votes: voters.len(),
                    voters: voters.clone(),
                })
                .collect(),
        });

        Ok(judge.elimination_target(state))
    }

    /// Asks every living player for a ballot concurrently. Contexts are
    /// built up front so every voter sees the same pre-round state; the
    /// results are applied only after the fan-in.
    async fn fan_out_votes(
        &self,
        state: &GameState,
        agents: &mut AgentPool,
        nominees: &[PlayerId],
    ) -> Result<Vec<(PlayerId, PlayerId)>, FatalError> {
        let ballots = agents
            .iter_mut()
            .filter_map(|(&id, agent)| {
                let player = state.player(id).filter(|p| p.is_alive())?;
                let ctx = AgentContext::build(
                    state,
                    player,
                    RequestKind::Vote {
                        nominees: nominees.to_vec(),
                    },
                );
                Some(async move {
                    let choice = agent.vote_choice(&ctx).await?;
                    Ok::<_, AgentError>((id, choice))
                })
            })
            .collect::<Vec<_>>();
        let results = futures::future::try_join_all(ballots).await?;
        Ok(results)
    }

    /// Bounded tie resolution: each pass gives the tied players an extra
    /// speech and a revote over the tied set only. A strictly smaller tie
    /// loops again; the same tie goes to an eliminate-all vote.
    async fn break_tie(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
        mut tied: Vec<PlayerId>,
    ) -> Result<(), FatalError> {
        let bound = tied.len();
        for _ in 0..bound {
            if tied.len() < 2 {
                return Ok(());
            }
            self.emitter.emit(Event::TieDetected {
                timestamp: Utc::now(),
                tied: tied.clone(),
                day: state.day(),
            });
            judge.announce(
                state,
                format!("The vote is tied between players {}.", id_list(&tied)),
            );
            judge.announce(
                state,
                "Tied players will each get an additional speech, then we will revote.",
            );
            for &speaker in &tied {
                self.tie_speech(state, judge, agents, speaker).await?;
            }

            let day = state.day();
            state.set_nominations(day, tied.clone());
            state.clear_votes(day);
            judge.announce(
                state,
                format!("Revote: You must vote between players {} only.", id_list(&tied)),
            );

            if let Some(target) = self.vote_round(state, judge, agents).await? {
                let voters = judge.voters_for(state, target);
                if eliminate_and_emit(
                    state,
                    &self.emitter,
                    target,
                    EliminationReason::TieBreakVote,
                    &voters,
                ) {
                    collect_final_speech(state, judge, agents, &self.emitter, target).await?;
                }
                return Ok(());
            }
            let still_tied = judge.tied_players(state);
            // The ballot was restricted to the tied set, so an equal-sized
            // tie is the same tie.
            if still_tied.len() >= tied.len() {
                return self.eliminate_all_vote(state, judge, agents, tied).await;
            }
            tied = still_tied;
        }
        judge.announce(
            state,
            "The tie could not be resolved. All tied players remain in the game.",
        );
        Ok(())
    }

    async fn tie_speech(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
        speaker: PlayerId,
    ) -> Result<(), FatalError> {
        judge.announce(
            state,
            format!("Player {speaker}, you have 30 seconds (reduced word limit) to speak."),
        );
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
            text,
            closing: false,
        });
        Ok(())
    }

    /// Last resort when a tie will not shrink: the table votes on whether
    /// every tied player leaves. A ballot naming a tied player counts in
    /// favour, self-votes included; anything else counts against.
    async fn eliminate_all_vote(
        &self,
        state: &mut GameState,
        judge: &mut Judge,
        agents: &mut AgentPool,
        tied: Vec<PlayerId>,
    ) -> Result<(), FatalError> {
        judge.announce(
            state,
            format!(
                "Same tie persists. Vote: Who is in favour of all nominated players {} leaving the game?",
                id_list(&tied)
            ),
        );
        let ballots = self.fan_out_votes(state, agents, &tied).await?;
        let total = ballots.len();
        let in_favor: Vec<PlayerId> = ballots
            .iter()
            .filter(|(_, choice)| tied.contains(choice))
            .map(|(voter, _)| *voter)
            .collect();

        // Strict majority eliminates everyone; an even split or a majority
        // against keeps the table intact.
        if in_favor.len() * 2 > total {
            judge.announce(
                state,
                format!(
                    "The majority votes to eliminate all tied players {}.",
                    id_list(&tied)
                ),
            );
            for &id in &tied {
                if eliminate_and_emit(
                    state,
                    &self.emitter,
                    id,
                    EliminationReason::TieBreakVote,
                    &in_favor,
                ) {
                    collect_final_speech(state, judge, agents, &self.emitter, id).await?;
                }
            }
        } else if in_favor.len() * 2 == total {
            judge.announce(state, "Vote splits evenly. All tied players remain in the game.");
        } else {
            judge.announce(state, "Majority votes to keep all. All tied players remain in the game.");
        }
        Ok(())
    }
}
