// Ephemeral real-time state derived from the event stream

pub mod achievements;
pub mod match_state;

pub use achievements::*;
pub use match_state::*;
