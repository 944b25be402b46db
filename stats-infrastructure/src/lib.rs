pub mod config;
pub mod repositories;
pub mod services;
pub mod state;

pub use config::*;
pub use repositories::*;
pub use services::*;
pub use state::*;
