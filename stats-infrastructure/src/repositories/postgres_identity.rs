use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use stats_domain::{IdentityInfo, IdentityRepository};

const MAX_ALIASES: i64 = 50;

type IdentityRow = (
    String,
    i64,
    String,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

/// `player_guid_registry` is the source of truth for guid to account links.
/// `smf_member_id = 0` marks a guid seen in game but never linked.
#[derive(Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS player_guid_registry (
    player_guid TEXT PRIMARY KEY,
    smf_member_id BIGINT NOT NULL DEFAULT 0,
    last_known_name TEXT NOT NULL DEFAULT '',
    first_seen_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_seen_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    confirmed_at TIMESTAMPTZ
)
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE INDEX IF NOT EXISTS idx_player_guid_registry_member
    ON player_guid_registry (smf_member_id)
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS player_name_aliases (
    player_guid TEXT NOT NULL,
    player_name TEXT NOT NULL,
    first_used_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_used_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    times_used INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (player_guid, player_name)
)
"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn lookup(&self, guid: &str) -> Result<Option<i64>> {
        let smf_id = sqlx::query_scalar::<_, i64>(
            "SELECT smf_member_id FROM player_guid_registry WHERE player_guid = $1",
        )
        .bind(guid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(smf_id)
    }

    async fn lookup_many(&self, guids: &[String]) -> Result<HashMap<String, i64>> {
        if guids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT player_guid, smf_member_id FROM player_guid_registry WHERE player_guid = ANY($1)",
        )
        .bind(guids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn register(&self, guid: &str, smf_id: i64, player_name: &str) -> Result<()> {
        sqlx::query(
            r#"
INSERT INTO player_guid_registry (player_guid, smf_member_id, last_known_name, confirmed_at)
VALUES ($1, $2, $3, NOW())
ON CONFLICT (player_guid) DO UPDATE SET
    smf_member_id = EXCLUDED.smf_member_id,
    last_known_name = CASE
        WHEN EXCLUDED.last_known_name <> '' THEN EXCLUDED.last_known_name
        ELSE player_guid_registry.last_known_name
    END,
    confirmed_at = NOW(),
    last_seen_at = NOW()
"#,
        )
        .bind(guid)
        .bind(smf_id)
        .bind(player_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn touch_last_seen(&self, guid: &str, player_name: &str) -> Result<()> {
        sqlx::query(
            r#"
INSERT INTO player_guid_registry (player_guid, last_known_name)
VALUES ($1, $2)
ON CONFLICT (player_guid) DO UPDATE SET
    last_known_name = CASE
        WHEN EXCLUDED.last_known_name <> '' THEN EXCLUDED.last_known_name
        ELSE player_guid_registry.last_known_name
    END,
    last_seen_at = NOW()
"#,
        )
        .bind(guid)
        .bind(player_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_alias(&self, guid: &str, player_name: &str) -> Result<()> {
        sqlx::query(
            r#"
INSERT INTO player_name_aliases (player_guid, player_name)
VALUES ($1, $2)
ON CONFLICT (player_guid, player_name) DO UPDATE SET
    last_used_at = NOW(),
    times_used = player_name_aliases.times_used + 1
"#,
        )
        .bind(guid)
        .bind(player_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn identity_info(&self, guid: &str) -> Result<Option<IdentityInfo>> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
SELECT player_guid, smf_member_id, last_known_name, confirmed_at, first_seen_at, last_seen_at
FROM player_guid_registry
WHERE player_guid = $1
"#,
        )
        .bind(guid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(guid, smf_id, last_known_name, confirmed_at, first_seen_at, last_seen_at)| {
                IdentityInfo {
                    verified: IdentityInfo::is_verified(smf_id, confirmed_at),
                    guid,
                    smf_id,
                    last_known_name,
                    confirmed_at,
                    first_seen_at,
                    last_seen_at,
                }
            },
        ))
    }

    async fn aliases(&self, guid: &str) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
SELECT player_name FROM player_name_aliases
WHERE player_guid = $1
ORDER BY last_used_at DESC
LIMIT $2
"#,
        )
        .bind(guid)
        .bind(MAX_ALIASES)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn ping(&self) -> Result<()> {
        let _: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
