use std::sync::Arc;

use stats_domain::ports::HealthCheckService;
use stats_domain::RuntimeConfig;

use crate::{IdentityResolver, IngestQueue, PipelineMetrics};

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub queue: IngestQueue,
    pub identity: Arc<IdentityResolver>,
    pub health: Arc<dyn HealthCheckService>,
    pub metrics: Arc<PipelineMetrics>,
}
