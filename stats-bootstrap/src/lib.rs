pub mod context;
pub mod lifecycle;
pub mod telemetry;

pub use lifecycle::run_standalone;
pub use telemetry::{init_tracing, TelemetryOptions};
