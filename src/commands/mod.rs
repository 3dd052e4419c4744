pub mod config;
pub mod dedupe_members;
pub mod migrate;
pub mod session;
