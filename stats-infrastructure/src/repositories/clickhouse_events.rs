use anyhow::Result;
use async_trait::async_trait;
use clickhouse::Client;
use tracing::debug;

use stats_domain::{EventSink, NormalizedRecord};

pub const RAW_EVENTS_TABLE: &str = "raw_events";

const CREATE_RAW_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS raw_events (
    timestamp DateTime64(3),
    match_id UUID,
    server_id LowCardinality(String),
    map_name LowCardinality(String),
    event_type LowCardinality(String),
    actor_id String,
    actor_name String,
    actor_team LowCardinality(String),
    actor_smf_id Int64,
    actor_weapon LowCardinality(String),
    actor_pos_x Float32,
    actor_pos_y Float32,
    actor_pos_z Float32,
    actor_pitch Float32,
    actor_yaw Float32,
    target_id String,
    target_name String,
    target_team LowCardinality(String),
    target_smf_id Int64,
    target_pos_x Float32,
    target_pos_y Float32,
    target_pos_z Float32,
    damage UInt32,
    hitloc LowCardinality(String),
    distance Float32,
    raw_json String
) ENGINE = MergeTree
PARTITION BY toYYYYMM(timestamp)
ORDER BY (event_type, match_id, timestamp)
"#;

#[derive(Clone)]
pub struct ClickhouseEventSink {
    client: Client,
    database: String,
}

impl ClickhouseEventSink {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }
}

#[async_trait]
impl EventSink for ClickhouseEventSink {
    async fn ensure_schema(&self) -> Result<()> {
        // The configured database may not exist yet.
        let create_db = format!("CREATE DATABASE IF NOT EXISTS {}", self.database);
        self.client
            .clone()
            .with_database("default")
            .query(&create_db)
            .execute()
            .await?;
        self.client.query(CREATE_RAW_EVENTS).execute().await?;
        Ok(())
    }

    async fn insert_records(&self, records: &[NormalizedRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut insert = self.client.insert(RAW_EVENTS_TABLE)?;
        for record in records {
            insert.write(record).await?;
        }
        insert.end().await?;
        debug!(rows = records.len(), "raw events inserted");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let _: u8 = self.client.query("SELECT toUInt8(1)").fetch_one().await?;
        Ok(())
    }
}
