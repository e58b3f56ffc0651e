//! Top-level match driver.
//!
//! `Game` wires the state, the judge, the three phase controllers, and
//! the decision-source pool together and drives the phase loop until a
//! terminal phase is reached. Decision failures are never retried: the
//! first one aborts the match in the failed phase.

use std::sync::Arc;

use chrono::Utc;

use crate::agent::{AgentPool, build_pool};
use crate::config::GameConfig;
use crate::error::FatalError;
use crate::judge::Judge;
use crate::observability::{Event, EventEmitter};
use crate::phases::{DayPhase, NightPhase, VotingPhase};
use crate::roles::Team;
use crate::state::{ActionRecord, GameOverReason, GameState, Phase};

/// How a match ended.
#[derive(Debug)]
pub enum Outcome {
    /// The game reached a verdict.
    Winner {
        team: Team,
        reason: GameOverReason,
    },
    /// A fatal decision failure aborted the match.
    Failed { error: FatalError },
}

/// One complete match.
pub struct Game {
    state: GameState,
    judge: Judge,
    day: DayPhase,
    night: NightPhase,
    voting: VotingPhase,
    agents: AgentPool,
    emitter: Arc<EventEmitter>,
}

impl Game {
    #[must_use]
    pub fn new(config: &GameConfig, emitter: Arc<EventEmitter>) -> Self {
        let state = GameState::new(config.max_rounds, config.random_seed);
        let agents = build_pool(&state, config);
        Self {
            judge: Judge::new(Arc::clone(&emitter), config.announcements),
            day: DayPhase::new(Arc::clone(&emitter)),
            night: NightPhase::new(Arc::clone(&emitter)),
            voting: VotingPhase::new(Arc::clone(&emitter)),
            state,
            agents,
            emitter,
        }
    }

    /// Builds a game over a prepared state and agent pool. Used by tests
    /// that need a known role layout or scripted behavior.
    #[must_use]
    pub fn with_parts(
        state: GameState,
        agents: AgentPool,
        emitter: Arc<EventEmitter>,
        announcements: bool,
    ) -> Self {
        Self {
            judge: Judge::new(Arc::clone(&emitter), announcements),
            day: DayPhase::new(Arc::clone(&emitter)),
            night: NightPhase::new(Arc::clone(&emitter)),
            voting: VotingPhase::new(Arc::clone(&emitter)),
            state,
            agents,
            emitter,
        }
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn judge(&self) -> &Judge {
        &self.judge
    }

    /// Plays the match to completion.
    pub async fn run(&mut self) -> Outcome {
        self.emitter.emit(Event::GameStarted {
            timestamp: Utc::now(),
            players: self.state.players().iter().map(|p| p.id()).collect(),
            mafia: self.state.mafia_alive(),
            sheriff: self.state.sheriff_alive(),
            seed: self.state.seed(),
        });

        match self.drive().await {
            Ok(()) => {
                // Drive only exits cleanly through end_game, which always
                // records a winner.
                let team = self
                    .state
                    .winner()
                    .expect("terminal game_over phase carries a winner");
                let reason = self.recorded_reason();
                self.emitter.emit(Event::GameOver {
                    timestamp: Utc::now(),
                    winner: Some(team),
                    reason,
                    day: self.state.day(),
                    night: self.state.night(),
                });
                tracing::info!(target: "game", %team, %reason, "match over");
                Outcome::Winner { team, reason }
            }
            Err(error) => {
                tracing::error!(target: "game", %error, "match aborted");
                self.state.fail();
                self.emitter.emit(Event::FatalError {
                    timestamp: Utc::now(),
                    message: error.to_string(),
                    player: error.player(),
                    action: error.action().map(str::to_owned),
                });
                self.emitter.emit(Event::GameOver {
                    timestamp: Utc::now(),
                    winner: None,
                    reason: GameOverReason::Failed,
                    day: self.state.day(),
                    night: self.state.night(),
                });
                Outcome::Failed { error }
            }
        }
    }

    async fn drive(&mut self) -> Result<(), FatalError> {
        while !self.state.phase().is_terminal() {
            self.emitter.emit(Event::PhaseChanged {
                timestamp: Utc::now(),
                phase: self.state.phase(),
                day: self.state.day(),
                night: self.state.night(),
            });
            match self.state.phase() {
                Phase::Day => {
                    self.day
                        .run(&mut self.state, &mut self.judge, &mut self.agents)
                        .await?;
                }
                Phase::Voting => {
                    self.voting
                        .run(&mut self.state, &mut self.judge, &mut self.agents)
                        .await?;
                    if !self.state.phase().is_terminal() {
                        self.state.start_night();
                    }
                }
                Phase::Night => {
                    self.night
                        .run(&mut self.state, &mut self.judge, &mut self.agents)
                        .await?;
                    if !self.state.phase().is_terminal() {
                        self.state.start_day();
                    }
                }
                Phase::Setup | Phase::GameOver | Phase::Failed => break,
            }
            // Covers verdicts that eliminations alone cannot trigger, in
            // particular the round cap taking effect at dawn.
            if !self.state.phase().is_terminal() {
                if let Some(winner) = self.state.check_win_condition() {
                    let reason = if self.state.max_rounds_reached() {
                        GameOverReason::MaxRounds
                    } else {
                        GameOverReason::WinCondition
                    };
                    self.state.end_game(winner, reason);
                }
            }
        }
        Ok(())
    }

    /// The reason recorded with the final game-over entry in the log.
    fn recorded_reason(&self) -> GameOverReason {
        self.state
            .log()
            .iter()
            .rev()
            .find_map(|record| match record {
                ActionRecord::GameOver { reason, .. } => Some(*reason),
                _ => None,
            })
            .unwrap_or(GameOverReason::WinCondition)
    }
}
