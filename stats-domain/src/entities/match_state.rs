use serde::{Deserialize, Serialize};

/// Ephemeral state of a match between `match_start` and `match_end`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveMatch {
    pub match_id: String,
    pub server_id: String,
    pub map_name: String,
    pub gametype: String,
    pub started_at: i64,
    pub round_number: i32,
    pub allies_score: i32,
    pub axis_score: i32,
    pub player_count: i32,
}

/// Heartbeat payload applied to a live match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchProgress {
    pub round_number: i32,
    pub allies_score: i32,
    pub axis_score: i32,
    pub player_count: i32,
}

/// Team held by one player at match end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamAssignment {
    pub player_guid: String,
    pub team: String,
}
