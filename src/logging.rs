use tracing_subscriber::EnvFilter;

/// Filter used when neither RUST_LOG nor config.toml name a valid one
pub const FALLBACK_LEVEL: &str = "warn";

/// Pick the filter: RUST_LOG wins, then the configured level, then warn.
pub fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}

/// Install the stderr subscriber. stdout stays reserved for command output.
/// Calling twice is harmless; the first subscriber stays.
pub fn init(configured: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(configured))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
