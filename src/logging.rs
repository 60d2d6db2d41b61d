use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,labrun=info";

/// Log to stderr, filtered by `RUST_LOG`. `debug` forces debug output for
/// this crate.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::new("warn,labrun=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
