//! Team role labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Recognised `teamPosition` values. Anything else is dropped from aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Top,
    Jungle,
    Middle,
    Bottom,
    Utility,
}

impl Role {
    pub fn from_team_position(position: &str) -> Option<Self> {
        match position {
            "TOP" => Some(Role::Top),
            "JUNGLE" => Some(Role::Jungle),
            "MIDDLE" => Some(Role::Middle),
            "BOTTOM" => Some(Role::Bottom),
            "UTILITY" => Some(Role::Utility),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Top => "TOP",
            Role::Jungle => "JUNGLE",
            Role::Middle => "MIDDLE",
            Role::Bottom => "BOTTOM",
            Role::Utility => "UTILITY",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
