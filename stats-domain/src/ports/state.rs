use std::time::Duration;

use async_trait::async_trait;

use crate::entities::{LiveMatch, MatchProgress, PlayerCounter, TeamAssignment};

/// Ephemeral per-match state. Every mutation is a single atomic
/// hash/set operation or a server-side script, never read-then-write.
#[async_trait]
pub trait MatchStateStore: Send + Sync {
    /// Creates the live state and clears any stale team, winner or player data.
    async fn start_match(&self, live: &LiveMatch) -> anyhow::Result<()>;
    /// Applies a heartbeat. Returns false when the match is not live.
    async fn update_progress(&self, match_id: &str, progress: &MatchProgress)
        -> anyhow::Result<bool>;
    async fn live_match(&self, match_id: &str) -> anyhow::Result<Option<LiveMatch>>;
    async fn active_matches(&self) -> anyhow::Result<Vec<String>>;
    async fn assign_team(&self, match_id: &str, player_guid: &str, team: &str)
        -> anyhow::Result<()>;
    async fn team_assignments(&self, match_id: &str) -> anyhow::Result<Vec<TeamAssignment>>;
    async fn record_winner(&self, match_id: &str, team: &str) -> anyhow::Result<()>;
    async fn recorded_winner(&self, match_id: &str) -> anyhow::Result<Option<String>>;
    async fn add_player(&self, match_id: &str, player_guid: &str) -> anyhow::Result<()>;
    async fn remove_player(&self, match_id: &str, player_guid: &str) -> anyhow::Result<()>;
    async fn record_player_name(&self, player_guid: &str, player_name: &str)
        -> anyhow::Result<()>;
    /// Deletes every key belonging to the match.
    async fn end_match(&self, match_id: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait PlayerCounterStore: Send + Sync {
    /// Atomic increment, returns the new value.
    async fn increment(&self, player_guid: &str, counter: PlayerCounter) -> anyhow::Result<i64>;
    /// Atomic set-add. Returns true only for the caller that added it.
    async fn mark_achievement(&self, player_guid: &str, achievement_id: &str)
        -> anyhow::Result<bool>;
}

/// Shared identity cache tier between process-local memory and the durable store.
#[async_trait]
pub trait IdentityCache: Send + Sync {
    async fn get(&self, guid: &str) -> anyhow::Result<Option<i64>>;
    /// Authoritative write, replaces whatever is cached.
    async fn put(&self, guid: &str, smf_id: i64, ttl: Duration) -> anyhow::Result<()>;
    /// Write-back of a read result. Never replaces an existing entry.
    async fn put_if_absent(&self, guid: &str, smf_id: i64, ttl: Duration) -> anyhow::Result<()>;

    async fn put_many_if_absent(
        &self,
        entries: &[(String, i64)],
        ttl: Duration,
    ) -> anyhow::Result<()> {
        for (guid, smf_id) in entries {
            self.put_if_absent(guid, *smf_id, ttl).await?;
        }
        Ok(())
    }
}
