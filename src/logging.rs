//! Log output for the binaries.

use tracing_subscriber::{EnvFilter, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Print log events to stderr.
///
/// The level defaults to `info` and can be changed with the `RUST_LOG`
/// environment variable, e.g. `RUST_LOG=money_tracker=debug`.
pub fn setup_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_log)
        .init();
}
