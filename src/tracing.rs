use tracing_subscriber::EnvFilter;

/// Set up the global fmt subscriber shared by all binaries.
///
/// `default_filter` is used when `RUST_LOG` is not set. Calling this twice
/// is harmless; the second call is a no-op.
pub fn init_tracing(default_filter: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // Diagnostics go to stderr; stdout is reserved for run summaries.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();
}
