use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stats_application::pipeline::IngestReceiver;
use stats_application::{ingest_channel, AppState, IdentityResolver, PipelineMetrics};
use stats_domain::ports::HealthCheckService;
use stats_domain::{IdentityInfo, IdentityRepository, PipelineConfig, RuntimeConfig};

#[derive(Default)]
pub struct MemoryIdentities {
    links: Mutex<HashMap<String, (i64, String)>>,
}

#[async_trait]
impl IdentityRepository for MemoryIdentities {
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn lookup(&self, guid: &str) -> anyhow::Result<Option<i64>> {
        Ok(self.links.lock().unwrap().get(guid).map(|(smf_id, _)| *smf_id))
    }

    async fn lookup_many(&self, guids: &[String]) -> anyhow::Result<HashMap<String, i64>> {
        let links = self.links.lock().unwrap();
        Ok(guids
            .iter()
            .filter_map(|guid| links.get(guid).map(|(smf_id, _)| (guid.clone(), *smf_id)))
            .collect())
    }

    async fn register(&self, guid: &str, smf_id: i64, player_name: &str) -> anyhow::Result<()> {
        self.links
            .lock()
            .unwrap()
            .insert(guid.to_string(), (smf_id, player_name.to_string()));
        Ok(())
    }

    async fn touch_last_seen(&self, _guid: &str, _player_name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn record_alias(&self, _guid: &str, _player_name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn identity_info(&self, guid: &str) -> anyhow::Result<Option<IdentityInfo>> {
        let links = self.links.lock().unwrap();
        Ok(links.get(guid).map(|(smf_id, name)| IdentityInfo {
            guid: guid.to_string(),
            smf_id: *smf_id,
            last_known_name: name.clone(),
            confirmed_at: None,
            first_seen_at: None,
            last_seen_at: None,
            verified: false,
        }))
    }

    async fn aliases(&self, _guid: &str) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct Healthy(pub bool);

#[async_trait]
impl HealthCheckService for Healthy {
    async fn check_analytics_store(&self) -> anyhow::Result<bool> {
        Ok(self.0)
    }

    async fn check_state_store(&self) -> anyhow::Result<bool> {
        Ok(self.0)
    }

    async fn check_identity_store(&self) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

pub fn runtime_config() -> RuntimeConfig {
    RuntimeConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        api_token: None,
        server_token_sha256: Vec::new(),
        max_body_bytes: 64 * 1024,
        request_timeout_seconds: 5,
        identity_cache_ttl: Duration::from_secs(300),
        match_state_ttl: Duration::from_secs(3600),
        pipeline: PipelineConfig::default(),
    }
}

pub fn app_state(config: RuntimeConfig, capacity: usize) -> (AppState, IngestReceiver) {
    let metrics = Arc::new(PipelineMetrics::default());
    let (queue, receiver) = ingest_channel(capacity, metrics.clone());
    let state = AppState {
        config,
        queue,
        identity: Arc::new(IdentityResolver::new(
            Arc::new(MemoryIdentities::default()),
            Duration::from_secs(300),
        )),
        health: Arc::new(Healthy(true)),
        metrics,
    };
    (state, receiver)
}
