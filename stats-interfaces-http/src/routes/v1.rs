use axum::routing::{get, post};
use axum::Router;

use stats_application::AppState;

use crate::handlers::{identity_handlers, ingest_handlers, ops_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/ingest/events", post(ingest_handlers::ingest_event))
        .route(
            "/api/v1/identity/register",
            post(identity_handlers::register_identity),
        )
        .route("/api/v1/identity/:guid", get(identity_handlers::get_identity))
        .route("/health", get(ops_handlers::health_live))
        .route("/ready", get(ops_handlers::health_ready))
        .route("/metrics", get(ops_handlers::metrics_prometheus))
        .with_state(state)
}
