//! Diagnostic logging setup.
//!
//! Logging goes to stderr through `tracing`, separate from the JSONL
//! event stream and the verdict on stdout. The level is driven by the
//! CLI verbosity count unless `MAFIASIM_LOG` supplies a full filter.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::cli::ColorChoice;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human output, colored when stderr is a terminal.
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Level directive for a `-v` count: `warn` by default, one step per
/// repeat, saturating at `trace`.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn filter_for(verbosity: u8) -> EnvFilter {
    match EnvFilter::try_from_env("MAFIASIM_LOG") {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(verbosity_to_directive(verbosity)),
    }
}

fn want_ansi(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    }
}

/// Installs the global subscriber. A second call is a no-op, so tests
/// can run this freely.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    // Module targets only add noise below debug level.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Human => builder.with_ansi(want_ansi(color)).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
