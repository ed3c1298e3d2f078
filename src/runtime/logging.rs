use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber, honouring `RUST_LOG` and falling back to
/// `default_level` when it is unset or invalid.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .try_init();
}
