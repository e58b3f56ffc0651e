//! Game configuration: YAML file plus CLI overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which decision-source implementation drives the players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Deterministic seeded agents, no external dependency.
    #[default]
    Scripted,
}

/// Match configuration.
///
/// Every field has a default so an empty file (or no file) yields a
/// playable game. CLI flags override file values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Day cap; reaching it forces the win comparison. `null` disables it.
    pub max_rounds: Option<u32>,
    /// Seed for the role deal and scripted agents. `null` draws a fresh one.
    pub random_seed: Option<u64>,
    /// Decision-source implementation.
    pub agent: AgentKind,
    /// Whether judge announcements are logged.
    pub announcements: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_rounds: Some(10),
            random_seed: None,
            agent: AgentKind::Scripted,
            announcements: true,
        }
    }
}

impl GameConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for values that parse but make
    /// no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_rounds".to_owned(),
                value: "0".to_owned(),
                expected: "a positive day count, or null to disable".to_owned(),
            });
        }
        Ok(())
    }
}

/// Loads configuration from a YAML file, or the defaults when no path is
/// given. An empty file is treated as all-defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is missing, unparsable, or fails
/// validation.
pub fn load_config(path: Option<&Path>) -> Result<GameConfig, ConfigError> {
    let config = match path {
        None => GameConfig::default(),
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
                path: path.to_path_buf(),
            })?;
            serde_yaml::from_str::<Option<GameConfig>>(&raw)
                .map_err(|e| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
                .unwrap_or_default()
        }
    };
    config.validate()?;
    Ok(config)
}
