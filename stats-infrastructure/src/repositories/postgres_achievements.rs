use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use stats_domain::{AchievementRepository, AchievementUnlock};

#[derive(Clone)]
pub struct PgAchievementRepository {
    pool: PgPool,
}

impl PgAchievementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AchievementRepository for PgAchievementRepository {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS player_achievements (
    player_guid TEXT NOT NULL,
    achievement_id TEXT NOT NULL,
    unlocked_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (player_guid, achievement_id)
)
"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_unlocked(&self, player_guid: &str, achievement_id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
SELECT EXISTS (
    SELECT 1 FROM player_achievements
    WHERE player_guid = $1 AND achievement_id = $2
)
"#,
        )
        .bind(player_guid)
        .bind(achievement_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn record_unlock(&self, unlock: &AchievementUnlock) -> Result<bool> {
        let result = sqlx::query(
            r#"
INSERT INTO player_achievements (player_guid, achievement_id)
VALUES ($1, $2)
ON CONFLICT (player_guid, achievement_id) DO NOTHING
"#,
        )
        .bind(&unlock.player_guid)
        .bind(&unlock.achievement_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
