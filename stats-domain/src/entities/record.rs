use clickhouse::Row;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One row of `raw_events`. Actor is the entity performing the action,
/// target the entity receiving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Row)]
pub struct NormalizedRecord {
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub timestamp: OffsetDateTime,
    #[serde(with = "clickhouse::serde::uuid")]
    pub match_id: Uuid,
    pub server_id: String,
    pub map_name: String,
    pub event_type: String,

    pub actor_id: String,
    pub actor_name: String,
    pub actor_team: String,
    pub actor_smf_id: i64,
    pub actor_weapon: String,
    pub actor_pos_x: f32,
    pub actor_pos_y: f32,
    pub actor_pos_z: f32,
    pub actor_pitch: f32,
    pub actor_yaw: f32,

    pub target_id: String,
    pub target_name: String,
    pub target_team: String,
    pub target_smf_id: i64,
    pub target_pos_x: f32,
    pub target_pos_y: f32,
    pub target_pos_z: f32,

    pub damage: u32,
    pub hitloc: String,
    /// Game units.
    pub distance: f32,

    pub raw_json: String,
}

impl NormalizedRecord {
    pub fn empty(timestamp: OffsetDateTime) -> Self {
        Self {
            timestamp,
            match_id: Uuid::nil(),
            server_id: String::new(),
            map_name: String::new(),
            event_type: String::new(),
            actor_id: String::new(),
            actor_name: String::new(),
            actor_team: String::new(),
            actor_smf_id: 0,
            actor_weapon: String::new(),
            actor_pos_x: 0.0,
            actor_pos_y: 0.0,
            actor_pos_z: 0.0,
            actor_pitch: 0.0,
            actor_yaw: 0.0,
            target_id: String::new(),
            target_name: String::new(),
            target_team: String::new(),
            target_smf_id: 0,
            target_pos_x: 0.0,
            target_pos_y: 0.0,
            target_pos_z: 0.0,
            damage: 0,
            hitloc: String::new(),
            distance: 0.0,
            raw_json: String::new(),
        }
    }

    pub fn has_target(&self) -> bool {
        !self.target_id.is_empty() || !self.target_name.is_empty()
    }
}
