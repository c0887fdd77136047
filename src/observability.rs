//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Initialize structured logging with `RUST_LOG` environment variable
/// support.
///
/// Defaults to `repograph=info` when `RUST_LOG` is not set. Call once at
/// program startup; subsequent calls are silently ignored.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("repograph=info"));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_does_not_panic() {
        init_logging();
        init_logging();
    }
}
