// In-memory port implementations shared by the unit tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stats_domain::ports::{
    AchievementRepository, EventSink, HealthCheckService, IdentityCache, IdentityRepository,
    MatchStateStore, PlayerCounterStore,
};
use stats_domain::{
    AchievementUnlock, IdentityInfo, LiveMatch, MatchProgress, NormalizedRecord, PipelineConfig,
    PlayerCounter, RuntimeConfig, TeamAssignment,
};

use crate::{ingest_channel, AppState, IdentityResolver, PipelineMetrics};

pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[derive(Default)]
pub struct RecordingSink {
    calls: AtomicUsize,
    fail_every: usize,
    batches: Mutex<Vec<Vec<NormalizedRecord>>>,
}

impl RecordingSink {
    /// Every `n`th insert call fails.
    pub fn failing_every(n: usize) -> Self {
        Self {
            fail_every: n,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<NormalizedRecord>> {
        self.batches.lock().expect("sink lock").clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn insert_records(&self, records: &[NormalizedRecord]) -> anyhow::Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && call % self.fail_every == 0 {
            anyhow::bail!("analytical store unavailable");
        }
        self.batches
            .lock()
            .expect("sink lock")
            .push(records.to_vec());
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingIdentityRepository {
    accounts: Mutex<HashMap<String, i64>>,
    names: Mutex<HashMap<String, String>>,
    aliases: Mutex<HashMap<String, Vec<String>>>,
    lookups: AtomicUsize,
    batch_lookups: AtomicUsize,
    lookup_delay: Option<Duration>,
    fail: bool,
}

impl CountingIdentityRepository {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Lookups read the store immediately but answer only after `delay`.
    pub fn with_lookup_delay(delay: Duration) -> Self {
        Self {
            lookup_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn insert(&self, guid: &str, smf_id: i64) {
        self.accounts
            .lock()
            .expect("accounts lock")
            .insert(guid.to_string(), smf_id);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn batch_lookups(&self) -> usize {
        self.batch_lookups.load(Ordering::SeqCst)
    }

    pub fn registered_name(&self, guid: &str) -> Option<String> {
        self.names.lock().expect("names lock").get(guid).cloned()
    }

    pub fn last_seen_name(&self, guid: &str) -> Option<String> {
        self.registered_name(guid)
    }

    pub fn aliases_of(&self, guid: &str) -> Vec<String> {
        self.aliases
            .lock()
            .expect("aliases lock")
            .get(guid)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("identity store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityRepository for CountingIdentityRepository {
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn lookup(&self, guid: &str) -> anyhow::Result<Option<i64>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let smf_id = self.accounts.lock().expect("accounts lock").get(guid).copied();
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(smf_id)
    }

    async fn lookup_many(&self, guids: &[String]) -> anyhow::Result<HashMap<String, i64>> {
        self.batch_lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let found: HashMap<String, i64> = {
            let accounts = self.accounts.lock().expect("accounts lock");
            guids
                .iter()
                .filter_map(|guid| accounts.get(guid).map(|id| (guid.clone(), *id)))
                .collect()
        };
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(found)
    }

    async fn register(&self, guid: &str, smf_id: i64, player_name: &str) -> anyhow::Result<()> {
        self.check()?;
        self.insert(guid, smf_id);
        self.names
            .lock()
            .expect("names lock")
            .insert(guid.to_string(), player_name.to_string());
        Ok(())
    }

    async fn touch_last_seen(&self, guid: &str, player_name: &str) -> anyhow::Result<()> {
        self.check()?;
        self.accounts
            .lock()
            .expect("accounts lock")
            .entry(guid.to_string())
            .or_insert(0);
        self.names
            .lock()
            .expect("names lock")
            .insert(guid.to_string(), player_name.to_string());
        Ok(())
    }

    async fn record_alias(&self, guid: &str, player_name: &str) -> anyhow::Result<()> {
        self.check()?;
        let mut aliases = self.aliases.lock().expect("aliases lock");
        let entry = aliases.entry(guid.to_string()).or_default();
        if !entry.iter().any(|name| name == player_name) {
            entry.push(player_name.to_string());
        }
        Ok(())
    }

    async fn identity_info(&self, guid: &str) -> anyhow::Result<Option<IdentityInfo>> {
        self.check()?;
        let Some(smf_id) = self.accounts.lock().expect("accounts lock").get(guid).copied() else {
            return Ok(None);
        };
        Ok(Some(IdentityInfo {
            guid: guid.to_string(),
            smf_id,
            last_known_name: self.registered_name(guid).unwrap_or_default(),
            confirmed_at: None,
            first_seen_at: None,
            last_seen_at: None,
            verified: false,
        }))
    }

    async fn aliases(&self, guid: &str) -> anyhow::Result<Vec<String>> {
        self.check()?;
        Ok(self.aliases_of(guid))
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.check()
    }
}

#[derive(Default)]
pub struct InMemoryIdentityCache {
    entries: Mutex<HashMap<String, i64>>,
}

#[async_trait]
impl IdentityCache for InMemoryIdentityCache {
    async fn get(&self, guid: &str) -> anyhow::Result<Option<i64>> {
        Ok(self.entries.lock().expect("cache lock").get(guid).copied())
    }

    async fn put(&self, guid: &str, smf_id: i64, _ttl: Duration) -> anyhow::Result<()> {
        self.entries
            .lock()
            .expect("cache lock")
            .insert(guid.to_string(), smf_id);
        Ok(())
    }

    async fn put_if_absent(&self, guid: &str, smf_id: i64, _ttl: Duration) -> anyhow::Result<()> {
        self.entries
            .lock()
            .expect("cache lock")
            .entry(guid.to_string())
            .or_insert(smf_id);
        Ok(())
    }
}

#[derive(Default)]
struct StateData {
    live: HashMap<String, LiveMatch>,
    active: BTreeSet<String>,
    teams: HashMap<String, HashMap<String, String>>,
    winners: HashMap<String, String>,
    players: HashMap<String, BTreeSet<String>>,
    names: HashMap<String, String>,
    counters: HashMap<(String, PlayerCounter), i64>,
    achievements: HashSet<(String, String)>,
}

/// Match state and counters behind one lock, mirroring the atomic
/// per-command semantics of the real store.
#[derive(Default)]
pub struct InMemoryStateStore {
    data: Mutex<StateData>,
}

impl InMemoryStateStore {
    pub fn is_match_cleared(&self, match_id: &str) -> bool {
        let data = self.data.lock().expect("state lock");
        !data.live.contains_key(match_id)
            && !data.active.contains(match_id)
            && !data.teams.contains_key(match_id)
            && !data.winners.contains_key(match_id)
            && !data.players.contains_key(match_id)
    }

    pub fn players(&self, match_id: &str) -> Vec<String> {
        let data = self.data.lock().expect("state lock");
        data.players
            .get(match_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn player_name(&self, guid: &str) -> Option<String> {
        self.data.lock().expect("state lock").names.get(guid).cloned()
    }

    pub fn set_counter(&self, guid: &str, counter: PlayerCounter, value: i64) {
        self.data
            .lock()
            .expect("state lock")
            .counters
            .insert((guid.to_string(), counter), value);
    }

    pub fn counter(&self, guid: &str, counter: PlayerCounter) -> i64 {
        self.data
            .lock()
            .expect("state lock")
            .counters
            .get(&(guid.to_string(), counter))
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl MatchStateStore for InMemoryStateStore {
    async fn start_match(&self, live: &LiveMatch) -> anyhow::Result<()> {
        let mut data = self.data.lock().expect("state lock");
        data.live.insert(live.match_id.clone(), live.clone());
        data.active.insert(live.match_id.clone());
        data.teams.remove(&live.match_id);
        data.winners.remove(&live.match_id);
        data.players.remove(&live.match_id);
        Ok(())
    }

    async fn update_progress(&self, match_id: &str, progress: &MatchProgress) -> anyhow::Result<bool> {
        let mut data = self.data.lock().expect("state lock");
        let Some(live) = data.live.get_mut(match_id) else {
            return Ok(false);
        };
        live.round_number = progress.round_number;
        live.allies_score = progress.allies_score;
        live.axis_score = progress.axis_score;
        live.player_count = progress.player_count;
        Ok(true)
    }

    async fn live_match(&self, match_id: &str) -> anyhow::Result<Option<LiveMatch>> {
        Ok(self.data.lock().expect("state lock").live.get(match_id).cloned())
    }

    async fn active_matches(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .data
            .lock()
            .expect("state lock")
            .active
            .iter()
            .cloned()
            .collect())
    }

    async fn assign_team(&self, match_id: &str, player_guid: &str, team: &str) -> anyhow::Result<()> {
        self.data
            .lock()
            .expect("state lock")
            .teams
            .entry(match_id.to_string())
            .or_default()
            .insert(player_guid.to_string(), team.to_string());
        Ok(())
    }

    async fn team_assignments(&self, match_id: &str) -> anyhow::Result<Vec<TeamAssignment>> {
        let data = self.data.lock().expect("state lock");
        let mut assignments: Vec<TeamAssignment> = data
            .teams
            .get(match_id)
            .map(|teams| {
                teams
                    .iter()
                    .map(|(guid, team)| TeamAssignment {
                        player_guid: guid.clone(),
                        team: team.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        assignments.sort_by(|a, b| a.player_guid.cmp(&b.player_guid));
        Ok(assignments)
    }

    async fn record_winner(&self, match_id: &str, team: &str) -> anyhow::Result<()> {
        self.data
            .lock()
            .expect("state lock")
            .winners
            .insert(match_id.to_string(), team.to_string());
        Ok(())
    }

    async fn recorded_winner(&self, match_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.data.lock().expect("state lock").winners.get(match_id).cloned())
    }

    async fn add_player(&self, match_id: &str, player_guid: &str) -> anyhow::Result<()> {
        self.data
            .lock()
            .expect("state lock")
            .players
            .entry(match_id.to_string())
            .or_default()
            .insert(player_guid.to_string());
        Ok(())
    }

    async fn remove_player(&self, match_id: &str, player_guid: &str) -> anyhow::Result<()> {
        let mut data = self.data.lock().expect("state lock");
        let now_empty = match data.players.get_mut(match_id) {
            Some(players) => {
                players.remove(player_guid);
                players.is_empty()
            }
            None => false,
        };
        if now_empty {
            data.players.remove(match_id);
        }
        Ok(())
    }

    async fn record_player_name(&self, player_guid: &str, player_name: &str) -> anyhow::Result<()> {
        self.data
            .lock()
            .expect("state lock")
            .names
            .insert(player_guid.to_string(), player_name.to_string());
        Ok(())
    }

    async fn end_match(&self, match_id: &str) -> anyhow::Result<()> {
        let mut data = self.data.lock().expect("state lock");
        data.live.remove(match_id);
        data.active.remove(match_id);
        data.teams.remove(match_id);
        data.winners.remove(match_id);
        data.players.remove(match_id);
        Ok(())
    }
}

#[async_trait]
impl PlayerCounterStore for InMemoryStateStore {
    async fn increment(&self, player_guid: &str, counter: PlayerCounter) -> anyhow::Result<i64> {
        let mut data = self.data.lock().expect("state lock");
        let value = data
            .counters
            .entry((player_guid.to_string(), counter))
            .or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn mark_achievement(&self, player_guid: &str, achievement_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .data
            .lock()
            .expect("state lock")
            .achievements
            .insert((player_guid.to_string(), achievement_id.to_string())))
    }
}

#[derive(Default)]
pub struct InMemoryAchievements {
    unlocked: Mutex<Vec<(String, String)>>,
}

impl InMemoryAchievements {
    pub fn seed(&self, player_guid: &str, achievement_id: &str) {
        self.unlocked
            .lock()
            .expect("achievements lock")
            .push((player_guid.to_string(), achievement_id.to_string()));
    }

    pub fn unlocks(&self) -> Vec<(String, String)> {
        self.unlocked.lock().expect("achievements lock").clone()
    }
}

#[async_trait]
impl AchievementRepository for InMemoryAchievements {
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn is_unlocked(&self, player_guid: &str, achievement_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .unlocked
            .lock()
            .expect("achievements lock")
            .iter()
            .any(|(guid, id)| guid == player_guid && id == achievement_id))
    }

    async fn record_unlock(&self, unlock: &AchievementUnlock) -> anyhow::Result<bool> {
        if self
            .is_unlocked(&unlock.player_guid, &unlock.achievement_id)
            .await?
        {
            return Ok(false);
        }
        self.seed(&unlock.player_guid, &unlock.achievement_id);
        Ok(true)
    }
}

pub struct StaticHealth(pub bool);

#[async_trait]
impl HealthCheckService for StaticHealth {
    async fn check_analytics_store(&self) -> anyhow::Result<bool> {
        Ok(self.0)
    }

    async fn check_state_store(&self) -> anyhow::Result<bool> {
        Ok(self.0)
    }

    async fn check_identity_store(&self) -> anyhow::Result<bool> {
        anyhow::ensure!(self.0, "postgres unreachable");
        Ok(true)
    }
}

pub fn runtime_config() -> RuntimeConfig {
    RuntimeConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        api_token: None,
        server_token_sha256: Vec::new(),
        max_body_bytes: 1024 * 1024,
        request_timeout_seconds: 5,
        identity_cache_ttl: Duration::from_secs(300),
        match_state_ttl: Duration::from_secs(3600),
        pipeline: PipelineConfig::default(),
    }
}

/// State over a queue of `capacity`, returned with its receiver so nothing drains it.
pub fn app_state(capacity: usize) -> (AppState, crate::pipeline::IngestReceiver) {
    let metrics = Arc::new(PipelineMetrics::default());
    let (queue, receiver) = ingest_channel(capacity, metrics.clone());
    let repo = Arc::new(CountingIdentityRepository::default());
    let state = AppState {
        config: runtime_config(),
        queue,
        identity: Arc::new(IdentityResolver::new(repo, Duration::from_secs(300))),
        health: Arc::new(StaticHealth(true)),
        metrics,
    };
    (state, receiver)
}
