use std::collections::HashMap;

use async_trait::async_trait;

use crate::entities::{AchievementUnlock, IdentityInfo, NormalizedRecord};

/// Append-only analytical store receiving flushed batches.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn ensure_schema(&self) -> anyhow::Result<()>;
    /// One multi-row insert. Either the whole batch lands or the call fails.
    async fn insert_records(&self, records: &[NormalizedRecord]) -> anyhow::Result<()>;
    async fn ping(&self) -> anyhow::Result<()>;
}

/// Durable source of truth for game identifier to account id links.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn ensure_schema(&self) -> anyhow::Result<()>;
    /// `None` when the identifier has never been seen.
    async fn lookup(&self, guid: &str) -> anyhow::Result<Option<i64>>;
    /// Only identifiers present in the store appear in the result.
    async fn lookup_many(&self, guids: &[String]) -> anyhow::Result<HashMap<String, i64>>;
    async fn register(&self, guid: &str, smf_id: i64, player_name: &str) -> anyhow::Result<()>;
    /// Never overwrites an existing account id.
    async fn touch_last_seen(&self, guid: &str, player_name: &str) -> anyhow::Result<()>;
    async fn record_alias(&self, guid: &str, player_name: &str) -> anyhow::Result<()>;
    async fn identity_info(&self, guid: &str) -> anyhow::Result<Option<IdentityInfo>>;
    /// Most recently used first.
    async fn aliases(&self, guid: &str) -> anyhow::Result<Vec<String>>;
    async fn ping(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait AchievementRepository: Send + Sync {
    async fn ensure_schema(&self) -> anyhow::Result<()>;
    async fn is_unlocked(&self, player_guid: &str, achievement_id: &str) -> anyhow::Result<bool>;
    /// Returns false when the unlock already existed.
    async fn record_unlock(&self, unlock: &AchievementUnlock) -> anyhow::Result<bool>;
}
