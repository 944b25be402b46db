pub mod identity_queries;
pub mod status_queries;
