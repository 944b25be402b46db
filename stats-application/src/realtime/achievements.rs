use std::sync::Arc;

use stats_domain::ports::{AchievementRepository, PlayerCounterStore};
use stats_domain::{AchievementUnlock, PlayerCounter};
use tracing::info;

use crate::metrics::PipelineMetrics;

/// Bumps per-player counters and unlocks milestone achievements.
pub struct AchievementTracker {
    counters: Arc<dyn PlayerCounterStore>,
    repo: Arc<dyn AchievementRepository>,
    metrics: Arc<PipelineMetrics>,
}

impl AchievementTracker {
    pub fn new(
        counters: Arc<dyn PlayerCounterStore>,
        repo: Arc<dyn AchievementRepository>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            counters,
            repo,
            metrics,
        }
    }

    /// Returns the achievement unlocked by this increment, if any.
    pub async fn record(
        &self,
        player_guid: &str,
        counter: PlayerCounter,
    ) -> anyhow::Result<Option<&'static str>> {
        if player_guid.is_empty() || player_guid == "world" {
            return Ok(None);
        }

        let count = self.counters.increment(player_guid, counter).await?;
        let Some(achievement_id) = counter.milestone(count) else {
            return Ok(None);
        };

        if self.grant(player_guid, achievement_id).await? {
            Ok(Some(achievement_id))
        } else {
            Ok(None)
        }
    }

    async fn grant(&self, player_guid: &str, achievement_id: &str) -> anyhow::Result<bool> {
        if !self
            .counters
            .mark_achievement(player_guid, achievement_id)
            .await?
        {
            return Ok(false);
        }
        if self.repo.is_unlocked(player_guid, achievement_id).await? {
            return Ok(false);
        }

        let unlock = AchievementUnlock {
            player_guid: player_guid.to_string(),
            achievement_id: achievement_id.to_string(),
        };
        let inserted = self.repo.record_unlock(&unlock).await?;
        if inserted {
            self.metrics.record_achievement();
            info!(player = player_guid, achievement = achievement_id, "achievement unlocked");
        }
        Ok(inserted)
    }
}
