// Telemetry Application Layer

pub mod commands;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod pipeline;
pub mod queries;
pub mod realtime;
pub mod state;

#[cfg(test)]
mod test_support;

pub use error::AppError;
pub use identity::{IdentityError, IdentityResolver};
pub use metrics::PipelineMetrics;
pub use pipeline::{ingest_channel, EventEffects, IngestQueue, IngestionPool, SideEffectPool};
pub use realtime::{AchievementTracker, MatchStateMachine};
pub use state::AppState;
