//! Tracing subscriber setup for the binary

/// Installs a fmt subscriber on stderr. `RUST_LOG` wins over `level`;
/// an unknown level falls back to `info`. Safe to call more than once.
pub fn init(level: &str, verbose: bool) {
    let fallback = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    };
    let fallback = if verbose { "debug" } else { fallback };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
