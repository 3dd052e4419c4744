//! Core types for the Soot household manager.
//!
//! This crate holds everything that does not touch the database or HTTP:
//! - important dates and their occurrence expansion
//! - tasks, RRULE recurrence and the calendar projection
//! - month keys and date ranges
//! - the iCal feed generator
//! - image job status rules, configuration and the shared error type

pub mod calendar;
pub mod config;
pub mod date_range;
pub mod error;
pub mod ics;
pub mod image_job;
pub mod important_date;
pub mod month_key;
pub mod occurrence;
pub mod recurrence;
pub mod task;

pub use config::SootConfig;
pub use date_range::DateRange;
pub use error::{SootError, SootResult};
pub use month_key::MonthKey;
pub use occurrence::{LeapDayPolicy, Occurrence, expand_occurrences};
