// Raw telemetry event as emitted by the game-server tracker

use serde::{Deserialize, Serialize};

use crate::utils::lenient;
use crate::value_objects::EventType;

/// Untrusted wire event. Only the fields relevant to `event_type` are populated;
/// everything else stays at its zero value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub match_id: String,
    pub session_id: String,
    pub server_id: String,
    #[serde(skip_serializing)]
    pub server_token: String,
    #[serde(deserialize_with = "lenient::number")]
    pub timestamp: f64,
    pub map_name: String,

    // Generic player
    pub player_name: String,
    pub player_guid: String,
    pub player_team: String,
    #[serde(deserialize_with = "lenient::number")]
    pub player_smf_id: i64,
    #[serde(deserialize_with = "lenient::number")]
    pub pos_x: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub pos_y: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub pos_z: f32,

    // Attacker
    pub attacker_name: String,
    pub attacker_guid: String,
    pub attacker_team: String,
    #[serde(deserialize_with = "lenient::number")]
    pub attacker_smf_id: i64,
    #[serde(deserialize_with = "lenient::number")]
    pub attacker_x: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub attacker_y: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub attacker_z: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub attacker_pitch: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub attacker_yaw: f32,

    // Victim
    pub victim_name: String,
    pub victim_guid: String,
    pub victim_team: String,
    #[serde(deserialize_with = "lenient::number")]
    pub victim_smf_id: i64,
    #[serde(deserialize_with = "lenient::number")]
    pub victim_x: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub victim_y: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub victim_z: f32,

    // Weapons and damage
    pub weapon: String,
    pub old_weapon: String,
    pub new_weapon: String,
    pub hitloc: String,
    pub inflictor: String,
    #[serde(deserialize_with = "lenient::number")]
    pub damage: i32,
    #[serde(deserialize_with = "lenient::number")]
    pub ammo_remaining: i32,

    // Movement
    #[serde(deserialize_with = "lenient::number")]
    pub fall_height: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub walked: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub sprinted: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub swam: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub driven: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub aim_pitch: f32,
    #[serde(deserialize_with = "lenient::number")]
    pub aim_yaw: f32,

    // Items
    pub item: String,
    #[serde(deserialize_with = "lenient::number")]
    pub count: i32,

    // Secondary target (weapon_hit, use)
    pub target_name: String,
    pub target_guid: String,
    #[serde(deserialize_with = "lenient::number")]
    pub target_smf_id: i64,

    // Teams and chat
    pub old_team: String,
    pub new_team: String,
    pub message: String,

    // Match lifecycle
    pub gametype: String,
    pub timelimit: String,
    pub fraglimit: String,
    pub maxclients: String,
    #[serde(deserialize_with = "lenient::number")]
    pub duration: f64,
    pub winning_team: String,
    #[serde(deserialize_with = "lenient::number")]
    pub allies_score: i32,
    #[serde(deserialize_with = "lenient::number")]
    pub axis_score: i32,
    #[serde(deserialize_with = "lenient::number")]
    pub round_number: i32,
    #[serde(deserialize_with = "lenient::number")]
    pub total_rounds: i32,
    #[serde(deserialize_with = "lenient::number")]
    pub player_count: i32,
    #[serde(deserialize_with = "lenient::number")]
    pub client_num: i32,

    // Identity claim
    pub code: String,

    // World, objectives, bots, vehicles
    pub entity: String,
    pub projectile: String,
    pub objective: String,
    pub objective_status: String,
    pub bot_id: String,
    pub seat: String,
}

impl RawEvent {
    pub fn new(event_type: EventType, match_id: impl Into<String>) -> Self {
        Self {
            event_type,
            match_id: match_id.into(),
            ..Self::default()
        }
    }

    /// Every event outside server/map lifecycle must belong to a match.
    pub fn requires_match_id(&self) -> bool {
        !self.event_type.is_server_lifecycle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_json_with_defaults() {
        let event: RawEvent = serde_json::from_str(
            r#"{"type":"kill","match_id":"m1","attacker_guid":"a","damage":"40","attacker_x":12.5}"#,
        )
        .expect("parse event");

        assert_eq!(event.event_type, EventType::Kill);
        assert_eq!(event.match_id, "m1");
        assert_eq!(event.damage, 40);
        assert_eq!(event.attacker_x, 12.5);
        assert_eq!(event.victim_guid, "");
        assert_eq!(event.timestamp, 0.0);
    }

    #[test]
    fn float_damage_is_truncated() {
        let event: RawEvent =
            serde_json::from_str(r#"{"type":"damage","damage":33.7,"timestamp":null}"#)
                .expect("parse event");
        assert_eq!(event.damage, 33);
        assert_eq!(event.timestamp, 0.0);
    }

    #[test]
    fn server_token_is_not_echoed() {
        let mut event = RawEvent::new(EventType::Heartbeat, "m1");
        event.server_token = "secret".to_string();
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(!json.contains("secret"));
        assert!(json.contains("\"type\":\"heartbeat\""));
    }
}
