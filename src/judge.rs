//! The judge: moderator announcements and rule adjudication.
//!
//! The judge owns everything that is "said by the table" rather than by a
//! player: phase announcements, nomination parsing and acceptance, vote
//! bookkeeping with default-vote resolution, and tie detection. It never
//! decides anything for a player; it only rules on what players did.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;

use crate::observability::{Event, EventEmitter};
use crate::state::{GameState, Phase, PlayerId};

/// Matches "nominate player number 5", "nominating 5", "nominate player 5"
/// and similar phrasings, case-insensitively via lowercased input.
static NOMINATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bnominat(?:e|ing)\s+(?:player\s+)?(?:number\s+)?(\d+)")
        .expect("nomination regex is valid")
});

/// Why a parsed nomination was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The number in the speech is not a valid seat.
    OutOfRange { raw: u64 },
    /// Players may not nominate themselves.
    SelfNomination,
    /// The target is not alive.
    TargetNotAlive { target: PlayerId },
    /// Someone already nominated this target today.
    AlreadyNominated {
        target: PlayerId,
        first_nominator: Option<PlayerId>,
    },
    /// Nominations are only accepted during the day phase.
    NotDayPhase,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { raw } => write!(f, "player {raw} does not exist"),
            Self::SelfNomination => f.write_str("players may not nominate themselves"),
            Self::TargetNotAlive { target } => {
                write!(f, "player {target} is not in the game")
            }
            Self::AlreadyNominated {
                target,
                first_nominator,
            } => match first_nominator {
                Some(by) => write!(f, "player {target} is already nominated by player {by}"),
                None => write!(f, "player {target} is already nominated"),
            },
            Self::NotDayPhase => f.write_str("nominations are only accepted during the day"),
        }
    }
}

/// Result of running a speech through the nomination rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NominationOutcome {
    /// The nomination stands.
    Accepted { target: PlayerId },
    /// A nomination was phrased but rejected.
    Rejected { reason: RejectReason },
    /// The speech contained no nomination.
    NoNomination,
}

/// The moderator. Holds the announcement transcript and per-day nominator
/// attribution; all game state lives in [`GameState`].
#[derive(Debug)]
pub struct Judge {
    emitter: Arc<EventEmitter>,
    announcements_enabled: bool,
    /// day → target → first nominator.
    nomination_sources: BTreeMap<u32, BTreeMap<PlayerId, PlayerId>>,
    announcements: Vec<String>,
}

impl Judge {
    #[must_use]
    pub fn new(emitter: Arc<EventEmitter>, announcements_enabled: bool) -> Self {
        Self {
            emitter,
            announcements_enabled,
            nomination_sources: BTreeMap::new(),
            announcements: Vec::new(),
        }
    }

    /// Everything the judge has said so far, in order.
    #[must_use]
    pub fn announcements(&self) -> &[String] {
        &self.announcements
    }

    /// Says something to the table: logs it, keeps it in the transcript,
    /// and emits it on the event stream.
    pub fn announce(&mut self, state: &GameState, text: impl Into<String>) {
        let text = text.into();
        if self.announcements_enabled {
            tracing::info!(target: "judge", "{text}");
        }
        self.emitter.emit(Event::Announcement {
            timestamp: Utc::now(),
            text: text.clone(),
            phase: state.phase(),
            day: state.day(),
            night: state.night(),
        });
        self.announcements.push(text);
    }

    // ------------------------------------------------------------------
    // Nominations
    // ------------------------------------------------------------------

    /// Extracts the first nomination phrase from a speech, if any.
    /// Matching is case-insensitive; only the raw target number is
    /// returned, validity is ruled on separately.
    #[must_use]
    pub fn parse_nomination(speech: &str) -> Option<u64> {
        let lowered = speech.to_lowercase();
        NOMINATION_RE
            .captures(&lowered)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Runs a speech through the nomination rules and applies an accepted
    /// nomination to the state. First-writer-wins: a repeat nomination of
    /// the same target is rejected with the original nominator attached.
    pub fn process_nomination(
        &mut self,
        state: &mut GameState,
        speaker: PlayerId,
        speech: &str,
    ) -> NominationOutcome {
        let Some(raw) = Self::parse_nomination(speech) else {
            return NominationOutcome::NoNomination;
        };
        if state.phase() != Phase::Day {
            return NominationOutcome::Rejected {
                reason: RejectReason::NotDayPhase,
            };
        }
        let Some(target) = u8::try_from(raw).ok().and_then(PlayerId::new) else {
            return NominationOutcome::Rejected {
                reason: RejectReason::OutOfRange { raw },
            };
        };
        if target == speaker {
            return NominationOutcome::Rejected {
                reason: RejectReason::SelfNomination,
            };
        }
        if !state.is_valid_target(target) {
            return NominationOutcome::Rejected {
                reason: RejectReason::TargetNotAlive { target },
            };
        }
        let day = state.day();
        if state.nominations_for(day).contains(&target) {
            // Logged as a rejected nomination; the list is unchanged.
            state.record_nomination(speaker, target);
            return NominationOutcome::Rejected {
                reason: RejectReason::AlreadyNominated {
                    target,
                    first_nominator: self.first_nominator(day, target),
                },
            };
        }

        state.record_nomination(speaker, target);
        if let Some(player) = state.player_mut(speaker) {
            player.record_nomination(target);
        }
        self.nomination_sources
            .entry(day)
            .or_default()
            .insert(target, speaker);
        NominationOutcome::Accepted { target }
    }

    /// Who first nominated `target` on `day`.
    #[must_use]
    pub fn first_nominator(&self, day: u32, target: PlayerId) -> Option<PlayerId> {
        self.nomination_sources
            .get(&day)
            .and_then(|m| m.get(&target))
            .copied()
    }

    /// Current day's nominees, in first-nomination order.
    #[must_use]
    pub fn nominated(&self, state: &GameState) -> Vec<PlayerId> {
        state.nominations_for(state.day()).to_vec()
    }

    /// Whether the day's nominations warrant a vote. Day one requires more
    /// than one nominee; later days vote on any non-empty list.
    #[must_use]
    pub fn can_vote(&self, state: &GameState) -> bool {
        let nominees = state.nominations_for(state.day());
        if nominees.is_empty() {
            return false;
        }
        state.day() > 1 || nominees.len() > 1
    }

    // ------------------------------------------------------------------
    // Votes
    // ------------------------------------------------------------------

    /// Records an explicit vote. Returns `false` when the vote is invalid:
    /// wrong phase, dead voter, or a target that is not on the ballot.
    pub fn process_vote(
        &mut self,
        state: &mut GameState,
        voter: PlayerId,
        target: PlayerId,
    ) -> bool {
        if state.phase() != Phase::Voting {
            return false;
        }
        if !state.is_valid_target(voter) {
            return false;
        }
        if !state.nominations_for(state.day()).contains(&target) {
            return false;
        }
        state.record_vote(voter, target);
        true
    }

    /// Every living player's effective vote. A voter with no explicit vote
    /// defaults to the last player nominated.
    #[must_use]
    pub fn resolved_votes(&self, state: &GameState) -> BTreeMap<PlayerId, PlayerId> {
        let day = state.day();
        let nominees = state.nominations_for(day);
        let Some(&default_target) = nominees.last() else {
            return BTreeMap::new();
        };
        let explicit = state.votes_for(day);
        state
            .alive_ids()
            .into_iter()
            .map(|voter| {
                let target = explicit
                    .and_then(|v| v.get(&voter))
                    .copied()
                    .unwrap_or(default_target);
                (voter, target)
            })
            .collect()
    }

    /// Per-nominee voter lists in nomination order, defaults resolved.
    #[must_use]
    pub fn vote_counts(&self, state: &GameState) -> Vec<(PlayerId, Vec<PlayerId>)> {
        let nominees = state.nominations_for(state.day()).to_vec();
        let resolved = self.resolved_votes(state);
        nominees
            .into_iter()
            .map(|nominee| {
                let voters: Vec<PlayerId> = resolved
                    .iter()
                    .filter(|&(_, &target)| target == nominee)
                    .map(|(&voter, _)| voter)
                    .collect();
                (nominee, voters)
            })
            .collect()
    }

    /// The voters attributed to `target`, defaults included.
    #[must_use]
    pub fn voters_for(&self, state: &GameState, target: PlayerId) -> Vec<PlayerId> {
        self.vote_counts(state)
            .into_iter()
            .find(|(nominee, _)| *nominee == target)
            .map(|(_, voters)| voters)
            .unwrap_or_default()
    }

    /// The unique nominee with the most votes, or `None` on a tie.
    #[must_use]
    pub fn elimination_target(&self, state: &GameState) -> Option<PlayerId> {
        let counts = self.vote_counts(state);
        let max = counts.iter().map(|(_, v)| v.len()).max()?;
        let mut leaders = counts.iter().filter(|(_, v)| v.len() == max);
        let leader = leaders.next()?;
        if leaders.next().is_some() {
            return None;
        }
        Some(leader.0)
    }

    /// All nominees sharing the top vote count. More than one entry means
    /// the round is tied.
    #[must_use]
    pub fn tied_players(&self, state: &GameState) -> Vec<PlayerId> {
        let counts = self.vote_counts(state);
        let Some(max) = counts.iter().map(|(_, v)| v.len()).max() else {
            return Vec::new();
        };
        counts
            .into_iter()
            .filter(|(_, v)| v.len() == max)
            .map(|(nominee, _)| nominee)
            .collect()
    }

    // ------------------------------------------------------------------
    // Speech rules
    // ------------------------------------------------------------------

    /// Whether a speech ends with a recognized terminator. Terminators must
    /// be uppercase, matching table convention.
    #[must_use]
    pub fn valid_speech_ending(text: &str) -> bool {
        let trimmed = text.trim_end();
        trimmed.ends_with("PASS") || trimmed.ends_with("THANK YOU")
    }

    /// Repairs a speech that is missing its terminator by appending
    /// `" PASS"`.
    #[must_use]
    pub fn repair_speech(text: &str) -> String {
        if Self::valid_speech_ending(text) {
            text.to_owned()
        } else {
            format!("{} PASS", text.trim_end())
        }
    }
}
