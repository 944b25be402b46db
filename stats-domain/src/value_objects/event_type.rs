// Event type tag carried by every telemetry event

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! event_types {
    ($($variant:ident => $tag:literal,)+) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum EventType {
            $($variant,)+
            /// Any tag the tracker sends that is not in the known set.
            Other(String),
        }

        impl EventType {
            /// Every known tag, in declaration order.
            pub const KNOWN: &'static [EventType] = &[$(EventType::$variant,)+];

            pub fn as_str(&self) -> &str {
                match self {
                    $(EventType::$variant => $tag,)+
                    EventType::Other(tag) => tag.as_str(),
                }
            }
        }

        impl From<&str> for EventType {
            fn from(s: &str) -> Self {
                let tag = s.trim().to_ascii_lowercase();
                match tag.as_str() {
                    $($tag => EventType::$variant,)+
                    _ => EventType::Other(tag),
                }
            }
        }
    };
}

event_types! {
    // Game flow
    GameInit => "game_init",
    GameStart => "game_start",
    GameEnd => "game_end",
    MatchStart => "match_start",
    MatchEnd => "match_end",
    MatchOutcome => "match_outcome",
    RoundStart => "round_start",
    RoundEnd => "round_end",
    WarmupStart => "warmup_start",
    WarmupEnd => "warmup_end",
    IntermissionStart => "intermission_start",
    // Combat
    Kill => "kill",
    Death => "death",
    Damage => "damage",
    PlayerPain => "player_pain",
    Headshot => "headshot",
    PlayerSuicide => "player_suicide",
    PlayerCrushed => "player_crushed",
    PlayerTelefragged => "player_telefragged",
    PlayerRoadkill => "player_roadkill",
    PlayerBash => "player_bash",
    PlayerTeamkill => "player_teamkill",
    // Weapons
    WeaponFire => "weapon_fire",
    WeaponHit => "weapon_hit",
    WeaponChange => "weapon_change",
    WeaponReload => "weapon_reload",
    WeaponReloadDone => "weapon_reload_done",
    WeaponReady => "weapon_ready",
    WeaponNoAmmo => "weapon_no_ammo",
    WeaponHolster => "weapon_holster",
    WeaponRaise => "weapon_raise",
    WeaponDrop => "weapon_drop",
    GrenadeThrow => "grenade_throw",
    GrenadeExplode => "grenade_explode",
    // Movement
    Jump => "jump",
    Land => "land",
    Crouch => "crouch",
    Prone => "prone",
    PlayerStand => "player_stand",
    PlayerSpawn => "player_spawn",
    PlayerRespawn => "player_respawn",
    Distance => "distance",
    LadderMount => "ladder_mount",
    LadderDismount => "ladder_dismount",
    // Interaction
    PlayerUse => "player_use",
    PlayerUseObjectStart => "player_use_object_start",
    PlayerUseObjectFinish => "player_use_object_finish",
    PlayerSpectate => "player_spectate",
    PlayerFreeze => "player_freeze",
    PlayerSay => "player_say",
    // Items
    ItemPickup => "item_pickup",
    ItemDrop => "item_drop",
    ItemRespawn => "item_respawn",
    HealthPickup => "health_pickup",
    AmmoPickup => "ammo_pickup",
    // Vehicles and turrets
    VehicleEnter => "vehicle_enter",
    VehicleExit => "vehicle_exit",
    VehicleDeath => "vehicle_death",
    VehicleCollision => "vehicle_collision",
    TurretEnter => "turret_enter",
    TurretExit => "turret_exit",
    // Server lifecycle
    ServerInit => "server_init",
    ServerStart => "server_start",
    ServerShutdown => "server_shutdown",
    ServerSpawned => "server_spawned",
    ServerConsoleCommand => "server_console_command",
    Heartbeat => "heartbeat",
    // Map lifecycle
    MapLoadStart => "map_load_start",
    MapLoadEnd => "map_load_end",
    MapChangeStart => "map_change_start",
    MapRestart => "map_restart",
    // Teams and votes
    TeamJoin => "team_join",
    TeamChange => "team_change",
    VoteStart => "vote_start",
    VotePassed => "vote_passed",
    VoteFailed => "vote_failed",
    // Client session
    ClientConnect => "client_connect",
    ClientDisconnect => "client_disconnect",
    ClientBegin => "client_begin",
    ClientUserinfoChanged => "client_userinfo_changed",
    PlayerInactivityDrop => "player_inactivity_drop",
    // World
    DoorOpen => "door_open",
    DoorClose => "door_close",
    Explosion => "explosion",
    // AI
    ActorSpawn => "actor_spawn",
    ActorKilled => "actor_killed",
    BotSpawn => "bot_spawn",
    BotKilled => "bot_killed",
    BotRoam => "bot_roam",
    BotCurious => "bot_curious",
    BotAttack => "bot_attack",
    // Objectives
    ObjectiveUpdate => "objective_update",
    ObjectiveCapture => "objective_capture",
    // Score and admin
    ScoreChange => "score_change",
    TeamkillKick => "teamkill_kick",
    // Legacy aliases and pipeline-only tags
    Connect => "connect",
    Disconnect => "disconnect",
    Spawn => "spawn",
    Chat => "chat",
    Use => "use",
    Reload => "reload",
    TeamWin => "team_win",
    IdentityClaim => "identity_claim",
}

impl EventType {
    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Other(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, EventType::Other(tag) if tag.is_empty())
    }

    /// Server and map lifecycle events are emitted outside of any match.
    pub fn is_server_lifecycle(&self) -> bool {
        matches!(
            self,
            EventType::GameInit
                | EventType::ServerInit
                | EventType::ServerStart
                | EventType::ServerShutdown
                | EventType::ServerSpawned
                | EventType::ServerConsoleCommand
                | EventType::MapLoadStart
                | EventType::MapLoadEnd
                | EventType::MapChangeStart
        )
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, EventType::Connect | EventType::ClientConnect)
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(self, EventType::Disconnect | EventType::ClientDisconnect)
    }

    pub fn is_spawn(&self) -> bool {
        matches!(self, EventType::Spawn | EventType::PlayerSpawn)
    }
}

impl Default for EventType {
    fn default() -> Self {
        EventType::Other(String::new())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TagVisitor;

        impl Visitor<'_> for TagVisitor {
            type Value = EventType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an event type tag")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<EventType, E> {
                Ok(EventType::from(v))
            }

            fn visit_unit<E: de::Error>(self) -> Result<EventType, E> {
                Ok(EventType::default())
            }
        }

        // `any` so that an explicit null reaches `visit_unit` as an empty tag.
        deserializer.deserialize_any(TagVisitor)
    }
}
