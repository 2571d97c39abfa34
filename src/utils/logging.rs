/// Initialize tracing for the process.
///
/// `level` is matched case-insensitively; anything unrecognised falls back to
/// `info`.
pub fn init(level: &str) {
    let lvl = parse_level(level);

    // try_init: tests and the CLI may call this more than once
    let _ = tracing_subscriber::fmt()
        .with_max_level(lvl)
        .with_target(false)
        .try_init();
}

pub(crate) fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}
