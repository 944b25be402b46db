pub mod redis_identity_cache;
pub mod redis_match_state;

pub use redis_identity_cache::*;
pub use redis_match_state::*;
