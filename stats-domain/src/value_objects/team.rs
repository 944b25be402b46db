// Team value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Allies,
    Axis,
    Spectator,
    Free,
    Other(String),
}

impl Team {
    pub fn as_str(&self) -> &str {
        match self {
            Team::Allies => "allies",
            Team::Axis => "axis",
            Team::Spectator => "spectator",
            Team::Free => "free",
            Team::Other(name) => name.as_str(),
        }
    }

    /// Canonical team key used in ephemeral state, empty when unset.
    pub fn normalize(raw: &str) -> String {
        Team::from(raw).as_str().to_string()
    }
}

impl From<&str> for Team {
    fn from(s: &str) -> Self {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "allies" => Team::Allies,
            "axis" => Team::Axis,
            "spectator" => Team::Spectator,
            "free" => Team::Free,
            _ => Team::Other(name),
        }
    }
}
