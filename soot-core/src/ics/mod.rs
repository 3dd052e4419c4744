//! iCalendar export.
//!
//! Produces the body of the calendar feed according to RFC 5545.

mod generate;

pub use generate::generate_feed;
