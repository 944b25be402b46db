// Domain value objects
pub mod event_type;
pub mod team;

pub use event_type::*;
pub use team::*;
