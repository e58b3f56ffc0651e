//! Role and team definitions for the ten-player roster.

use serde::{Deserialize, Serialize};

/// Team affiliation. Red is the civilian side, Black the mafia side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Civilians and the Sheriff.
    Red,
    /// Mafia members and the Don.
    Black,
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Red => write!(f, "Red"),
            Self::Black => write!(f, "Black"),
        }
    }
}

/// A player's role. Each role belongs to exactly one [`Team`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Plain Red player with no night action.
    Civilian,
    /// Red investigator; checks one player's team per night.
    Sheriff,
    /// Black player; proposes a kill claim each night.
    Mafia,
    /// Black leader; checks for the Sheriff and makes the binding kill decision.
    Don,
}

impl RoleKind {
    /// Returns the team this role belongs to.
    #[must_use]
    pub const fn team(self) -> Team {
        match self {
            Self::Civilian | Self::Sheriff => Team::Red,
            Self::Mafia | Self::Don => Team::Black,
        }
    }

    /// Returns `true` for Black-team roles.
    #[must_use]
    pub const fn is_black(self) -> bool {
        matches!(self, Self::Mafia | Self::Don)
    }

    /// Returns `true` for roles that perform a night check.
    #[must_use]
    pub const fn can_check(self) -> bool {
        matches!(self, Self::Sheriff | Self::Don)
    }
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Civilian => write!(f, "Civilian"),
            Self::Sheriff => write!(f, "Sheriff"),
            Self::Mafia => write!(f, "Mafia"),
            Self::Don => write!(f, "Don"),
        }
    }
}

/// The fixed role distribution for a ten-player game:
/// six Civilians, one Sheriff, two Mafia, one Don.
#[must_use]
pub const fn role_distribution() -> [RoleKind; 10] {
    [
        RoleKind::Civilian,
        RoleKind::Civilian,
        RoleKind::Civilian,
        RoleKind::Civilian,
        RoleKind::Civilian,
        RoleKind::Civilian,
        RoleKind::Sheriff,
        RoleKind::Mafia,
        RoleKind::Mafia,
        RoleKind::Don,
    ]
}
