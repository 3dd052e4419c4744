//! Database access, one module per aggregate.
//!
//! Functions take the pool explicitly and return `anyhow::Result`; domain
//! failures are raised as `SootError` so the HTTP layer can map them.

pub mod accounts;
pub mod budget;
pub mod catalog;
pub mod feed_tokens;
pub mod houses;
pub mod image_jobs;
pub mod important_dates;
pub mod inventory;
pub mod tasks;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
