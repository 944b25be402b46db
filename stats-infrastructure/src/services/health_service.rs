use std::sync::Arc;

use async_trait::async_trait;
use stats_domain::ports::HealthCheckService;
use stats_domain::{EventSink, IdentityRepository};

use crate::state::RedisMatchStateStore;

pub struct DefaultHealthService {
    events: Arc<dyn EventSink>,
    state: RedisMatchStateStore,
    identity: Arc<dyn IdentityRepository>,
}

impl DefaultHealthService {
    pub fn new(
        events: Arc<dyn EventSink>,
        state: RedisMatchStateStore,
        identity: Arc<dyn IdentityRepository>,
    ) -> Self {
        Self {
            events,
            state,
            identity,
        }
    }
}

#[async_trait]
impl HealthCheckService for DefaultHealthService {
    async fn check_analytics_store(&self) -> anyhow::Result<bool> {
        self.events.ping().await.map(|_| true)
    }

    async fn check_state_store(&self) -> anyhow::Result<bool> {
        self.state.ping().await.map(|_| true)
    }

    async fn check_identity_store(&self) -> anyhow::Result<bool> {
        self.identity.ping().await.map(|_| true)
    }
}
