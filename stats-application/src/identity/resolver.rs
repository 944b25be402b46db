use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use stats_domain::ports::{IdentityCache, IdentityRepository};
use stats_domain::{sanitize_name, IdentityInfo, UNLINKED_ACCOUNT};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_IDENTITY_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid identity input: {0}")]
    InvalidInput(String),
    /// The durable store failed. Distinct from "not registered", which is `Ok(0)`.
    #[error("identity store error: {0}")]
    Store(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy)]
struct CachedIdentity {
    smf_id: i64,
    cached_at: Instant,
}

/// Resolves game identifiers to account ids through process memory,
/// an optional shared cache and the durable store, in that order.
/// Misses are cached as `UNLINKED_ACCOUNT` with the same TTL as hits.
///
/// Lookup results never replace an entry written after the lookup began,
/// so a registration racing a slow lookup keeps its account id.
pub struct IdentityResolver {
    repo: Arc<dyn IdentityRepository>,
    shared: Option<Arc<dyn IdentityCache>>,
    local: RwLock<HashMap<String, CachedIdentity>>,
    ttl: Duration,
}

impl IdentityResolver {
    pub fn new(repo: Arc<dyn IdentityRepository>, ttl: Duration) -> Self {
        Self {
            repo,
            shared: None,
            local: RwLock::new(HashMap::new()),
            ttl: if ttl.is_zero() { DEFAULT_IDENTITY_TTL } else { ttl },
        }
    }

    pub fn with_shared_cache(mut self, cache: Arc<dyn IdentityCache>) -> Self {
        self.shared = Some(cache);
        self
    }

    pub async fn resolve(&self, guid: &str) -> Result<i64, IdentityError> {
        if guid.is_empty() {
            return Ok(UNLINKED_ACCOUNT);
        }

        if let Some(smf_id) = self.local_get(guid) {
            return Ok(smf_id);
        }

        let started = Instant::now();
        if let Some(shared) = &self.shared {
            match shared.get(guid).await {
                Ok(Some(smf_id)) => return Ok(self.local_write_back(guid, smf_id, started)),
                Ok(None) => {}
                Err(err) => warn!(guid, error = %err, "shared identity cache read failed"),
            }
        }

        let smf_id = self
            .repo
            .lookup(guid)
            .await
            .map_err(IdentityError::Store)?
            .unwrap_or(UNLINKED_ACCOUNT);

        let smf_id = self.local_write_back(guid, smf_id, started);
        if let Some(shared) = &self.shared {
            if let Err(err) = shared.put_if_absent(guid, smf_id, self.ttl).await {
                warn!(guid, error = %err, "shared identity cache write failed");
            }
        }
        Ok(smf_id)
    }

    /// One durable round trip for everything the local tier cannot answer.
    pub async fn resolve_batch(&self, guids: &[String]) -> Result<HashMap<String, i64>, IdentityError> {
        let mut resolved = HashMap::with_capacity(guids.len());
        let mut remaining = Vec::new();
        let mut seen = HashSet::new();

        for guid in guids {
            if guid.is_empty() || !seen.insert(guid.as_str()) {
                continue;
            }
            match self.local_get(guid) {
                Some(smf_id) => {
                    resolved.insert(guid.clone(), smf_id);
                }
                None => remaining.push(guid.clone()),
            }
        }

        if remaining.is_empty() {
            return Ok(resolved);
        }

        let started = Instant::now();
        let found = self
            .repo
            .lookup_many(&remaining)
            .await
            .map_err(IdentityError::Store)?;

        let entries: Vec<(String, i64)> = remaining
            .into_iter()
            .map(|guid| {
                let smf_id = found.get(&guid).copied().unwrap_or(UNLINKED_ACCOUNT);
                (guid, smf_id)
            })
            .collect();

        let entries = self.local_write_back_many(entries, started);
        if let Some(shared) = &self.shared {
            if let Err(err) = shared.put_many_if_absent(&entries, self.ttl).await {
                warn!(count = entries.len(), error = %err, "shared identity cache write failed");
            }
        }

        resolved.extend(entries);
        Ok(resolved)
    }

    /// Authoritative link, replaces any cached mapping including a cached miss.
    pub async fn register(&self, guid: &str, smf_id: i64, player_name: &str) -> Result<(), IdentityError> {
        let guid = guid.trim();
        if guid.is_empty() {
            return Err(IdentityError::InvalidInput("guid is required".to_string()));
        }
        if smf_id <= UNLINKED_ACCOUNT {
            return Err(IdentityError::InvalidInput("smf_id must be positive".to_string()));
        }

        self.repo
            .register(guid, smf_id, &sanitize_name(player_name))
            .await
            .map_err(IdentityError::Store)?;
        self.local_put(guid, smf_id);
        if let Some(shared) = &self.shared {
            if let Err(err) = shared.put(guid, smf_id, self.ttl).await {
                warn!(guid, error = %err, "shared identity cache write failed");
            }
        }
        debug!(guid, smf_id, "identity registered");
        Ok(())
    }

    pub async fn update_last_seen(&self, guid: &str, player_name: &str) -> Result<(), IdentityError> {
        if guid.is_empty() {
            return Ok(());
        }
        self.repo
            .touch_last_seen(guid, &sanitize_name(player_name))
            .await
            .map_err(IdentityError::Store)
    }

    pub async fn record_alias(&self, guid: &str, player_name: &str) -> Result<(), IdentityError> {
        let name = sanitize_name(player_name);
        if guid.is_empty() || name.is_empty() {
            return Ok(());
        }
        self.repo
            .record_alias(guid, &name)
            .await
            .map_err(IdentityError::Store)
    }

    pub async fn identity_info(&self, guid: &str) -> Result<Option<IdentityInfo>, IdentityError> {
        self.repo
            .identity_info(guid)
            .await
            .map_err(IdentityError::Store)
    }

    pub async fn aliases(&self, guid: &str) -> Result<Vec<String>, IdentityError> {
        self.repo.aliases(guid).await.map_err(IdentityError::Store)
    }

    /// Drops the process-local tier only.
    pub fn clear_cache(&self) {
        self.local
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn cached_len(&self) -> usize {
        self.local
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn local_get(&self, guid: &str) -> Option<i64> {
        let local = self.local.read().unwrap_or_else(PoisonError::into_inner);
        local
            .get(guid)
            .filter(|entry| entry.cached_at.elapsed() < self.ttl)
            .map(|entry| entry.smf_id)
    }

    fn local_put(&self, guid: &str, smf_id: i64) {
        let mut local = self.local.write().unwrap_or_else(PoisonError::into_inner);
        local.insert(
            guid.to_string(),
            CachedIdentity {
                smf_id,
                cached_at: Instant::now(),
            },
        );
    }

    /// Caches a lookup result unless a fresher entry landed while the lookup
    /// was in flight. Returns the value the local tier now holds.
    fn local_write_back(&self, guid: &str, smf_id: i64, started: Instant) -> i64 {
        let mut local = self.local.write().unwrap_or_else(PoisonError::into_inner);
        write_back(&mut local, guid, smf_id, started)
    }

    fn local_write_back_many(&self, entries: Vec<(String, i64)>, started: Instant) -> Vec<(String, i64)> {
        let mut local = self.local.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .into_iter()
            .map(|(guid, smf_id)| {
                let smf_id = write_back(&mut local, &guid, smf_id, started);
                (guid, smf_id)
            })
            .collect()
    }
}

fn write_back(
    local: &mut HashMap<String, CachedIdentity>,
    guid: &str,
    smf_id: i64,
    started: Instant,
) -> i64 {
    if let Some(entry) = local.get(guid) {
        if entry.cached_at > started {
            return entry.smf_id;
        }
    }
    local.insert(
        guid.to_string(),
        CachedIdentity {
            smf_id,
            cached_at: Instant::now(),
        },
    );
    smf_id
}
