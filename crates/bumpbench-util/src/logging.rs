/// Initialize the process-wide `tracing` subscriber. Both the miner and
/// reproducer binaries call this once at the top of `main`; log level is
/// controlled by `RUST_LOG`, defaulting to `warn`.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}
