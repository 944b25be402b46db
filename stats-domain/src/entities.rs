// Domain entities

pub mod achievement;
pub mod config;
pub mod event;
pub mod identity;
pub mod match_state;
pub mod record;

pub use achievement::*;
pub use config::*;
pub use event::*;
pub use identity::*;
pub use match_state::*;
pub use record::*;
