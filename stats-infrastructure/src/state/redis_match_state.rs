use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use time::OffsetDateTime;

use stats_domain::{
    LiveMatch, MatchProgress, MatchStateStore, PlayerCounter, PlayerCounterStore, TeamAssignment,
};

pub const ACTIVE_MATCHES_KEY: &str = "active_match_ids";
pub const PLAYER_NAMES_KEY: &str = "player_names";
const WINNER_FIELD: &str = "team";
const DEFAULT_MATCH_TTL: Duration = Duration::from_secs(6 * 60 * 60);

// Heartbeats must never resurrect a match that already ended.
const UPDATE_PROGRESS_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1],
    'round_number', ARGV[1],
    'allies_score', ARGV[2],
    'axis_score', ARGV[3],
    'player_count', ARGV[4],
    'updated_at', ARGV[5])
redis.call('EXPIRE', KEYS[1], ARGV[6])
return 1
"#;

pub fn state_key(match_id: &str) -> String {
    format!("match:{}:state", match_id)
}

pub fn teams_key(match_id: &str) -> String {
    format!("match:{}:teams", match_id)
}

pub fn winner_key(match_id: &str) -> String {
    format!("match:{}:winner", match_id)
}

pub fn players_key(match_id: &str) -> String {
    format!("match:{}:players", match_id)
}

pub fn counter_key(player_guid: &str, counter: PlayerCounter) -> String {
    format!("player:{}:{}", player_guid, counter.as_str())
}

pub fn achievements_key(player_guid: &str) -> String {
    format!("player:{}:achievements", player_guid)
}

/// Match state in Redis. Every key of a match expires after `ttl` so an
/// abandoned match cannot leak memory.
#[derive(Clone)]
pub struct RedisMatchStateStore {
    conn: ConnectionManager,
    ttl_seconds: i64,
    update_progress: Script,
}

impl RedisMatchStateStore {
    pub fn new(conn: ConnectionManager, ttl: Duration) -> Self {
        let ttl = if ttl.is_zero() { DEFAULT_MATCH_TTL } else { ttl };
        Self {
            conn,
            ttl_seconds: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
            update_progress: Script::new(UPDATE_PROGRESS_SCRIPT),
        }
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn live_match_fields(live: &LiveMatch) -> Vec<(&'static str, String)> {
    vec![
        ("match_id", live.match_id.clone()),
        ("server_id", live.server_id.clone()),
        ("map_name", live.map_name.clone()),
        ("gametype", live.gametype.clone()),
        ("started_at", live.started_at.to_string()),
        ("round_number", live.round_number.to_string()),
        ("allies_score", live.allies_score.to_string()),
        ("axis_score", live.axis_score.to_string()),
        ("player_count", live.player_count.to_string()),
    ]
}

fn parse_live_match(match_id: &str, fields: &HashMap<String, String>) -> Option<LiveMatch> {
    if fields.is_empty() {
        return None;
    }
    let text = |name: &str| fields.get(name).cloned().unwrap_or_default();
    let number = |name: &str| {
        fields
            .get(name)
            .and_then(|value| value.parse::<i32>().ok())
            .unwrap_or_default()
    };
    Some(LiveMatch {
        match_id: match_id.to_string(),
        server_id: text("server_id"),
        map_name: text("map_name"),
        gametype: text("gametype"),
        started_at: fields
            .get("started_at")
            .and_then(|value| value.parse().ok())
            .unwrap_or_default(),
        round_number: number("round_number"),
        allies_score: number("allies_score"),
        axis_score: number("axis_score"),
        player_count: number("player_count"),
    })
}

#[async_trait]
impl MatchStateStore for RedisMatchStateStore {
    async fn start_match(&self, live: &LiveMatch) -> Result<()> {
        let mut conn = self.conn.clone();
        let state = state_key(&live.match_id);
        let _: () = redis::pipe()
            .atomic()
            .del(vec![
                state.clone(),
                teams_key(&live.match_id),
                winner_key(&live.match_id),
                players_key(&live.match_id),
            ])
            .ignore()
            .hset_multiple(&state, &live_match_fields(live))
            .ignore()
            .expire(&state, self.ttl_seconds)
            .ignore()
            .sadd(ACTIVE_MATCHES_KEY, &live.match_id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn update_progress(&self, match_id: &str, progress: &MatchProgress) -> Result<bool> {
        let mut conn = self.conn.clone();
        let updated: i64 = self
            .update_progress
            .key(state_key(match_id))
            .arg(progress.round_number)
            .arg(progress.allies_score)
            .arg(progress.axis_score)
            .arg(progress.player_count)
            .arg(OffsetDateTime::now_utc().unix_timestamp())
            .arg(self.ttl_seconds)
            .invoke_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    async fn live_match(&self, match_id: &str) -> Result<Option<LiveMatch>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(state_key(match_id)).await?;
        Ok(parse_live_match(match_id, &fields))
    }

    async fn active_matches(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut ids: Vec<String> = conn.smembers(ACTIVE_MATCHES_KEY).await?;
        ids.sort();
        Ok(ids)
    }

    async fn assign_team(&self, match_id: &str, player_guid: &str, team: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = teams_key(match_id);
        let _: () = redis::pipe()
            .hset(&key, player_guid, team)
            .ignore()
            .expire(&key, self.ttl_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn team_assignments(&self, match_id: &str) -> Result<Vec<TeamAssignment>> {
        let mut conn = self.conn.clone();
        let teams: HashMap<String, String> = conn.hgetall(teams_key(match_id)).await?;
        let mut assignments: Vec<TeamAssignment> = teams
            .into_iter()
            .map(|(player_guid, team)| TeamAssignment { player_guid, team })
            .collect();
        assignments.sort_by(|a, b| a.player_guid.cmp(&b.player_guid));
        Ok(assignments)
    }

    async fn record_winner(&self, match_id: &str, team: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = winner_key(match_id);
        let _: () = redis::pipe()
            .hset(&key, WINNER_FIELD, team)
            .ignore()
            .expire(&key, self.ttl_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn recorded_winner(&self, match_id: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let team: Option<String> = conn.hget(winner_key(match_id), WINNER_FIELD).await?;
        Ok(team.filter(|team| !team.is_empty()))
    }

    async fn add_player(&self, match_id: &str, player_guid: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = players_key(match_id);
        let _: () = redis::pipe()
            .sadd(&key, player_guid)
            .ignore()
            .expire(&key, self.ttl_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove_player(&self, match_id: &str, player_guid: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.srem(players_key(match_id), player_guid).await?;
        Ok(())
    }

    async fn record_player_name(&self, player_guid: &str, player_name: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.hset(PLAYER_NAMES_KEY, player_guid, player_name).await?;
        Ok(())
    }

    async fn end_match(&self, match_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(vec![
                state_key(match_id),
                teams_key(match_id),
                winner_key(match_id),
                players_key(match_id),
            ])
            .ignore()
            .srem(ACTIVE_MATCHES_KEY, match_id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PlayerCounterStore for RedisMatchStateStore {
    async fn increment(&self, player_guid: &str, counter: PlayerCounter) -> Result<i64> {
        let mut conn = self.conn.clone();
        let count: i64 = conn.incr(counter_key(player_guid, counter), 1).await?;
        Ok(count)
    }

    async fn mark_achievement(&self, player_guid: &str, achievement_id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let added: i64 = conn.sadd(achievements_key(player_guid), achievement_id).await?;
        Ok(added == 1)
    }
}
