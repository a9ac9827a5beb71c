use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "dormglide_sync=debug,dormglide_remote=info,dormglide_store=info,warn";

/// Install a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .try_init();
}
