//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::{AgentKind, GameConfig};

/// Ten-player mafia match simulator.
#[derive(Parser, Debug)]
#[command(name = "mafiasim", author, version, about)]
pub struct Cli {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "MAFIASIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seed for the role deal and scripted agents.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Day cap; reaching it forces the win comparison.
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Decision-source implementation.
    #[arg(long, value_enum)]
    pub agent: Option<AgentKind>,

    /// Write the JSONL event stream to this file instead of stderr.
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    /// Disable the event stream entirely.
    #[arg(long, conflicts_with = "events_file")]
    pub no_events: bool,

    /// Emit logs as JSON instead of human-readable lines.
    #[arg(long)]
    pub log_json: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", env = "MAFIASIM_COLOR")]
    pub color: ColorChoice,
}

impl Cli {
    /// Applies command-line overrides on top of a loaded config file.
    pub fn apply_overrides(&self, config: &mut GameConfig) {
        if let Some(seed) = self.seed {
            config.random_seed = Some(seed);
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = Some(max_rounds);
        }
        if let Some(agent) = self.agent {
            config.agent = agent;
        }
        if self.quiet {
            config.announcements = false;
        }
    }
}

/// Color output control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Color when stderr is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}
