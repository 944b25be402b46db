use async_trait::async_trait;

#[async_trait]
pub trait HealthCheckService: Send + Sync {
    async fn check_analytics_store(&self) -> anyhow::Result<bool>;
    async fn check_state_store(&self) -> anyhow::Result<bool>;
    async fn check_identity_store(&self) -> anyhow::Result<bool>;
}
