//! Append-only public record of everything that happened at the table.
//!
//! The action log is the single source of truth for replay and for the
//! public history handed to decision sources. Every record is tagged with
//! the day or night it belongs to at creation time.

use serde::{Deserialize, Serialize};

use crate::roles::Team;
use crate::state::player::PlayerId;

/// Why a player left the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationReason {
    /// Voted out during the regular voting phase.
    Voting,
    /// Sole nominee on day two or later, eliminated without a vote.
    UnanimousNomination,
    /// Killed by the mafia at night.
    NightKill,
    /// Eliminated by the tie-break procedure.
    TieBreakVote,
}

impl std::fmt::Display for EliminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Voting => "voting",
            Self::UnanimousNomination => "unanimous nomination",
            Self::NightKill => "night kill",
            Self::TieBreakVote => "tie-break vote",
        };
        f.write_str(s)
    }
}

/// Why the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// A team satisfied its win condition.
    WinCondition,
    /// The round cap forced a comparison of living counts.
    MaxRounds,
    /// A fatal decision failure aborted the game.
    Failed,
}

impl std::fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::WinCondition => "win condition",
            Self::MaxRounds => "max rounds",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One entry in the public action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionRecord {
    GameStart {
        players: Vec<PlayerId>,
    },
    DayStart {
        day: u32,
    },
    NightStart {
        night: u32,
    },
    VotingStart {
        day: u32,
    },
    Speech {
        player: PlayerId,
        day: u32,
        text: String,
        closing: bool,
    },
    Nomination {
        nominator: PlayerId,
        target: PlayerId,
        day: u32,
        accepted: bool,
    },
    Vote {
        voter: PlayerId,
        target: PlayerId,
        day: u32,
    },
    Elimination {
        player: PlayerId,
        reason: EliminationReason,
        day: Option<u32>,
        night: Option<u32>,
        voters: Vec<PlayerId>,
    },
    GameOver {
        winner: Option<Team>,
        reason: GameOverReason,
        day: u32,
        night: u32,
    },
}
