use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub clickhouse: bool,
    pub redis: bool,
    pub postgres: bool,
    pub queue_depth: usize,
    pub queue_capacity: usize,
}

pub async fn readiness(state: &AppState) -> Readiness {
    let clickhouse = probe("clickhouse", state.health.check_analytics_store().await);
    let redis = probe("redis", state.health.check_state_store().await);
    let postgres = probe("postgres", state.health.check_identity_store().await);

    Readiness {
        ready: clickhouse && redis && postgres,
        clickhouse,
        redis,
        postgres,
        queue_depth: state.queue.depth(),
        queue_capacity: state.queue.capacity(),
    }
}

pub fn render_metrics(state: &AppState) -> String {
    state.metrics.render_prometheus(state.queue.depth())
}

fn probe(store: &str, result: anyhow::Result<bool>) -> bool {
    match result {
        Ok(ok) => ok,
        Err(err) => {
            warn!(store, error = %err, "readiness probe failed");
            false
        }
    }
}
