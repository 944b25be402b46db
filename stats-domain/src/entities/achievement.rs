use serde::{Deserialize, Serialize};

/// Per-player rolling counters kept in the ephemeral store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerCounter {
    Kills,
    Headshots,
}

impl PlayerCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerCounter::Kills => "kills",
            PlayerCounter::Headshots => "headshots",
        }
    }

    /// Milestones at which an achievement unlocks.
    pub fn thresholds(&self) -> &'static [(i64, &'static str)] {
        match self {
            PlayerCounter::Kills => &[
                (100, "KILL_100"),
                (500, "KILL_500"),
                (1000, "KILL_1000"),
                (5000, "KILL_5000"),
                (10000, "KILL_10000"),
            ],
            PlayerCounter::Headshots => &[
                (50, "HEADSHOT_50"),
                (100, "HEADSHOT_100"),
                (500, "HEADSHOT_500"),
                (1000, "HEADSHOT_1000"),
            ],
        }
    }

    /// Achievement reached exactly at `count`, if any.
    pub fn milestone(&self, count: i64) -> Option<&'static str> {
        self.thresholds()
            .iter()
            .find(|(threshold, _)| *threshold == count)
            .map(|(_, id)| *id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    pub player_guid: String,
    pub achievement_id: String,
}
