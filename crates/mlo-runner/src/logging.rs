//! Logging setup for the binary

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "warn,mlo_runner=info,mlo_catalog=info";

/// Initialize logging to stderr
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. Stdout stays free for reports.
/// Calling this twice is a no-op.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
