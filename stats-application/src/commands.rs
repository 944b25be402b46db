pub mod identity_commands;
pub mod ingest_commands;
