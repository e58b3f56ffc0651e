//! Error taxonomy and process exit codes.
//!
//! Decision-source failures are fatal: the engine never retries a source,
//! it ends the match in the failed phase and surfaces the cause. The exit
//! code table follows sysexits conventions where they apply.

use std::path::PathBuf;

use crate::roles::RoleKind;
use crate::state::PlayerId;

/// Process exit codes.
pub mod exit_code {
    /// Clean run, game reached a verdict.
    pub const SUCCESS: u8 = 0;
    /// Unclassified error.
    pub const ERROR: u8 = 1;
    /// Configuration could not be loaded or validated.
    pub const CONFIG_ERROR: u8 = 2;
    /// I/O failure outside the game itself.
    pub const IO_ERROR: u8 = 3;
    /// The match aborted in the failed phase.
    pub const GAME_FAILED: u8 = 4;
    /// Bad command-line usage.
    pub const USAGE_ERROR: u8 = 64;
    /// Interrupted by SIGINT.
    pub const INTERRUPTED: u8 = 130;
    /// Terminated by SIGTERM.
    pub const TERMINATED: u8 = 143;
}

/// A decision source failed to produce a usable answer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    /// The source returned an empty or whitespace-only response.
    #[error("player {player} returned an empty response for {action}")]
    EmptyResponse { player: PlayerId, action: String },

    /// The source itself failed.
    #[error("player {player} failed during {action}: {message}")]
    SourceFailure {
        player: PlayerId,
        action: String,
        message: String,
    },
}

impl AgentError {
    #[must_use]
    pub fn player(&self) -> PlayerId {
        match self {
            Self::EmptyResponse { player, .. } | Self::SourceFailure { player, .. } => *player,
        }
    }

    #[must_use]
    pub fn action(&self) -> &str {
        match self {
            Self::EmptyResponse { action, .. } | Self::SourceFailure { action, .. } => action,
        }
    }
}

/// A role that was alive at nightfall performed no night action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightViolation {
    pub role: RoleKind,
    pub player: PlayerId,
}

impl std::fmt::Display for NightViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (player {}) performed no night action", self.role, self.player)
    }
}

fn join_violations(violations: &[NightViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that abort the match.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FatalError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("mandatory night actions missing: {}", join_violations(.0))]
    NightValidation(Vec<NightViolation>),
}

impl FatalError {
    /// The player whose decision source caused the failure, if any.
    #[must_use]
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::Agent(err) => Some(err.player()),
            Self::NightValidation(_) => None,
        }
    }

    /// The action label in flight when the failure occurred, if any.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        match self {
            Self::Agent(err) => Some(err.action()),
            Self::NightValidation(_) => None,
        }
    }
}

/// Configuration problems, all mapped to [`exit_code::CONFIG_ERROR`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("failed to parse {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid value for {field}: {value} (expected {expected})")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

/// Top-level error for the binary.
#[derive(Debug, thiserror::Error)]
pub enum MafiasimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MafiasimError {
    /// Maps the error onto the process exit code table.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => exit_code::CONFIG_ERROR,
            Self::Io(_) => exit_code::IO_ERROR,
            Self::Fatal(_) => exit_code::GAME_FAILED,
        }
    }
}

pub type Result<T> = std::result::Result<T, MafiasimError>;
