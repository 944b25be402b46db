pub mod clickhouse_events;
pub mod postgres_achievements;
pub mod postgres_identity;

pub use clickhouse_events::*;
pub use postgres_achievements::*;
pub use postgres_identity::*;
