//! `tracing-subscriber` initialization. stdio-transport gateway runs must
//! never write to stdout - that stream is reserved exclusively for
//! JSON-RPC frames (spec §6) - so logging there goes to stderr and stays
//! off by default, same rule `turbomcp-server` applies to its own stdio
//! transport.

use tracing_subscriber::EnvFilter;

/// Set to force logging on for stdio-transport gateway runs (debugging
/// only - the gateway's own stdout framing is unaffected since logs
/// always go to stderr).
const FORCE_LOGGING_ENV: &str = "GATEKEEPER_FORCE_LOGGING";

pub fn should_log_for_stdio() -> bool {
    std::env::var(FORCE_LOGGING_ENV).is_ok()
}

pub fn init(level: &str, json: bool, stdio_mode: bool) {
    if stdio_mode && !should_log_for_stdio() {
        return;
    }
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = if json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    if let Err(e) = result {
        eprintln!("failed to initialize logging: {e}");
    }
}
