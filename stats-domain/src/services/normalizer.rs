use std::collections::HashMap;

use time::OffsetDateTime;

use crate::entities::{NormalizedRecord, RawEvent};
use crate::utils::{distance_3d, event_time, match_uuid, sanitize_name};
use crate::value_objects::EventType;

/// Fills the actor/target columns of a record from one event shape.
pub type MappingRule = fn(&RawEvent, &mut NormalizedRecord);

/// Event type to column mapping table, built once and shared by all workers.
pub struct Normalizer {
    rules: HashMap<EventType, MappingRule>,
    fallback: MappingRule,
}

impl Normalizer {
    /// Table with a rule registered for every known event type.
    pub fn standard() -> Self {
        let mut normalizer = Self {
            rules: HashMap::with_capacity(EventType::KNOWN.len()),
            fallback: player_actor,
        };

        for event_type in EventType::KNOWN {
            normalizer.register(event_type.clone(), player_actor);
        }

        for event_type in [
            EventType::Kill,
            EventType::Headshot,
            EventType::PlayerBash,
            EventType::PlayerRoadkill,
            EventType::PlayerTeamkill,
            EventType::PlayerTelefragged,
            EventType::BotKilled,
            EventType::ActorKilled,
        ] {
            normalizer.register(event_type, kill);
        }
        normalizer.register(EventType::Damage, damage);
        normalizer.register(EventType::PlayerPain, damage);
        normalizer.register(EventType::Death, death);
        normalizer.register(EventType::WeaponFire, weapon_fire);
        normalizer.register(EventType::WeaponHit, weapon_hit);
        normalizer.register(EventType::WeaponChange, weapon_change);
        normalizer.register(EventType::GrenadeThrow, grenade);
        normalizer.register(EventType::GrenadeExplode, grenade);
        normalizer.register(EventType::PlayerUse, player_use);
        normalizer.register(EventType::Use, player_use);
        normalizer.register(EventType::MatchOutcome, match_outcome);
        normalizer.register(EventType::TeamJoin, team_change);
        normalizer.register(EventType::TeamChange, team_change);
        normalizer.register(EventType::TeamWin, team_win);
        normalizer.register(EventType::Distance, distance);

        normalizer
    }

    pub fn register(&mut self, event_type: EventType, rule: MappingRule) {
        self.rules.insert(event_type, rule);
    }

    pub fn has_rule(&self, event_type: &EventType) -> bool {
        self.rules.contains_key(event_type)
    }

    pub fn rule_for(&self, event_type: &EventType) -> MappingRule {
        self.rules.get(event_type).copied().unwrap_or(self.fallback)
    }

    pub fn normalize(
        &self,
        event: &RawEvent,
        raw_json: &str,
        received_at: OffsetDateTime,
    ) -> NormalizedRecord {
        let mut record = NormalizedRecord::empty(event_time(event.timestamp, received_at));
        record.match_id = match_uuid(&event.match_id);
        record.server_id = event.server_id.clone();
        record.map_name = event.map_name.clone();
        record.event_type = event.event_type.as_str().to_string();
        record.raw_json = raw_json.to_string();

        (self.rule_for(&event.event_type))(event, &mut record);

        record.actor_name = sanitize_name(&record.actor_name);
        record.target_name = sanitize_name(&record.target_name);
        record
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::standard()
    }
}

fn is_placed(pos: (f32, f32, f32)) -> bool {
    pos != (0.0, 0.0, 0.0)
}

fn set_player_actor(event: &RawEvent, record: &mut NormalizedRecord) {
    record.actor_id = event.player_guid.clone();
    record.actor_name = event.player_name.clone();
    record.actor_team = event.player_team.clone();
    record.actor_smf_id = event.player_smf_id;
    record.actor_pos_x = event.pos_x;
    record.actor_pos_y = event.pos_y;
    record.actor_pos_z = event.pos_z;
}

fn set_attacker_actor(event: &RawEvent, record: &mut NormalizedRecord) {
    record.actor_id = event.attacker_guid.clone();
    record.actor_name = event.attacker_name.clone();
    record.actor_team = event.attacker_team.clone();
    record.actor_smf_id = event.attacker_smf_id;
    record.actor_pos_x = event.attacker_x;
    record.actor_pos_y = event.attacker_y;
    record.actor_pos_z = event.attacker_z;
    record.actor_pitch = event.attacker_pitch;
    record.actor_yaw = event.attacker_yaw;
}

fn set_victim_target(event: &RawEvent, record: &mut NormalizedRecord) {
    record.target_id = event.victim_guid.clone();
    record.target_name = event.victim_name.clone();
    record.target_team = event.victim_team.clone();
    record.target_smf_id = event.victim_smf_id;
    record.target_pos_x = event.victim_x;
    record.target_pos_y = event.victim_y;
    record.target_pos_z = event.victim_z;
}

fn set_secondary_target(event: &RawEvent, record: &mut NormalizedRecord) {
    record.target_id = event.target_guid.clone();
    record.target_name = event.target_name.clone();
    record.target_smf_id = event.target_smf_id;
}

/// Generic single-actor rule, also the fallback for unknown types.
fn player_actor(event: &RawEvent, record: &mut NormalizedRecord) {
    set_player_actor(event, record);
    record.actor_weapon = event.weapon.clone();
}

fn kill(event: &RawEvent, record: &mut NormalizedRecord) {
    set_attacker_actor(event, record);
    set_victim_target(event, record);
    record.actor_weapon = event.weapon.clone();
    record.hitloc = event.hitloc.clone();
    record.damage = event.damage.max(0) as u32;

    let attacker = (event.attacker_x, event.attacker_y, event.attacker_z);
    let victim = (event.victim_x, event.victim_y, event.victim_z);
    if is_placed(attacker) && is_placed(victim) {
        record.distance = distance_3d(attacker, victim);
    }
}

fn damage(event: &RawEvent, record: &mut NormalizedRecord) {
    set_attacker_actor(event, record);
    set_victim_target(event, record);
    record.actor_weapon = event.weapon.clone();
    record.hitloc = event.hitloc.clone();
    record.damage = event.damage.max(0) as u32;
}

// The dying player is the subject of a death row; the killer, if any, is the target.
fn death(event: &RawEvent, record: &mut NormalizedRecord) {
    if event.player_guid.is_empty() && !event.victim_guid.is_empty() {
        record.actor_id = event.victim_guid.clone();
        record.actor_name = event.victim_name.clone();
        record.actor_team = event.victim_team.clone();
        record.actor_smf_id = event.victim_smf_id;
        record.actor_pos_x = event.victim_x;
        record.actor_pos_y = event.victim_y;
        record.actor_pos_z = event.victim_z;
    } else {
        set_player_actor(event, record);
    }
    record.actor_weapon = event.weapon.clone();
    record.target_id = event.attacker_guid.clone();
    record.target_name = event.attacker_name.clone();
    record.target_team = event.attacker_team.clone();
    record.target_smf_id = event.attacker_smf_id;
    record.target_pos_x = event.attacker_x;
    record.target_pos_y = event.attacker_y;
    record.target_pos_z = event.attacker_z;
    record.hitloc = event.hitloc.clone();
}

fn weapon_fire(event: &RawEvent, record: &mut NormalizedRecord) {
    set_player_actor(event, record);
    record.actor_weapon = event.weapon.clone();
    record.actor_pitch = event.aim_pitch;
    record.actor_yaw = event.aim_yaw;
}

fn weapon_hit(event: &RawEvent, record: &mut NormalizedRecord) {
    set_player_actor(event, record);
    set_secondary_target(event, record);
    record.actor_weapon = event.weapon.clone();
    record.hitloc = event.hitloc.clone();
    record.damage = event.damage.max(0) as u32;
}

fn weapon_change(event: &RawEvent, record: &mut NormalizedRecord) {
    set_player_actor(event, record);
    record.actor_weapon = if event.new_weapon.is_empty() {
        event.weapon.clone()
    } else {
        event.new_weapon.clone()
    };
}

fn grenade(event: &RawEvent, record: &mut NormalizedRecord) {
    set_player_actor(event, record);
    record.actor_weapon = if event.weapon.is_empty() {
        event.projectile.clone()
    } else {
        event.weapon.clone()
    };
}

fn player_use(event: &RawEvent, record: &mut NormalizedRecord) {
    set_player_actor(event, record);
    set_secondary_target(event, record);
    if record.target_id.is_empty() && record.target_name.is_empty() {
        record.target_name = event.entity.clone();
    }
}

// Win flag rides in `damage`, gametype in `actor_weapon`.
fn match_outcome(event: &RawEvent, record: &mut NormalizedRecord) {
    record.actor_id = event.player_guid.clone();
    record.actor_name = event.player_name.clone();
    record.actor_team = event.player_team.clone();
    record.actor_smf_id = event.player_smf_id;
    record.damage = event.count.max(0) as u32;
    record.actor_weapon = event.gametype.clone();
}

fn team_change(event: &RawEvent, record: &mut NormalizedRecord) {
    set_player_actor(event, record);
    if !event.new_team.is_empty() {
        record.actor_team = event.new_team.clone();
    }
}

fn team_win(event: &RawEvent, record: &mut NormalizedRecord) {
    record.actor_team = if event.winning_team.is_empty() {
        event.player_team.clone()
    } else {
        event.winning_team.clone()
    };
}

fn distance(event: &RawEvent, record: &mut NormalizedRecord) {
    set_player_actor(event, record);
    record.distance = event.walked + event.sprinted + event.swam + event.driven;
}
