//! Log level parsing and subscriber setup for the command line tools.

use tracing_subscriber::filter::LevelFilter;

/// Map a `--log-level` value to a filter.
///
/// Accepts the conventional severity names in any case. `CRITICAL` and
/// `FATAL` map to ERROR, the most severe level tracing has, and `NOTSET`
/// enables everything. Unknown names fall back to INFO.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_ascii_uppercase().as_str() {
        "NOTSET" => LevelFilter::TRACE,
        "DEBUG" => LevelFilter::DEBUG,
        "INFO" => LevelFilter::INFO,
        "WARNING" | "WARN" => LevelFilter::WARN,
        "ERROR" | "CRITICAL" | "FATAL" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// Install the global subscriber. Call once, before any work starts.
pub fn init(level: LevelFilter) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .init();
}
