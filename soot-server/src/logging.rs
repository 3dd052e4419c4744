//! Tracing subscriber setup shared by the server binary and the CLI.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "SOOT_LOG";

const DEFAULT_FILTER: &str = "soot=info,tower_http=info,sqlx=warn";

/// Install the global subscriber. Safe to call more than once.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
