use drone_detector_common::config::LogLevel;
use tracing_subscriber::EnvFilter;

/// Filter for the subscriber: `RUST_LOG` when it is set and valid,
/// otherwise the selected level for everything.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()))
}

/// Install the global fmt subscriber. Returns whether the configured level
/// name was understood, so the caller can warn once logging is up.
pub fn init(level_name: &str) -> (LogLevel, bool) {
    let (level, known) = LogLevel::parse_or_info(level_name);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .init();
    (level, known)
}
