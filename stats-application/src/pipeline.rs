// Ingestion pipeline: bounded queue, batching workers, bounded side effects

pub mod effects;
pub mod pool;
pub mod queue;
pub mod side_effects;

pub use effects::*;
pub use pool::*;
pub use queue::*;
pub use side_effects::*;
