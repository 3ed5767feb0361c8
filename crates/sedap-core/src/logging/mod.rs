//! Structured logging with `tracing`.
//!
//! - [`init_subscriber`] installs the process-wide stderr subscriber
//! - [`capture_logs`] installs a thread-local capturing subscriber for tests
//!
//! Targets used across the workspace:
//! - [`DEBUGGEE_TARGET`] for diagnostic lines the debuggee asks to print
//! - [`NOTIFY_TARGET`] for user-visible notifications raised by a bridge

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

/// Target for debuggee-originated `log` events.
pub const DEBUGGEE_TARGET: &str = "sedap::debuggee";

/// Target for user-visible notifications.
pub const NOTIFY_TARGET: &str = "sedap::notify";

/// Initialize the global tracing subscriber with stderr output only.
///
/// `RUST_LOG` takes precedence over `level`. Subsequent calls are no-ops.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // set_global_default is a no-op if already set
    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_subscriber_does_not_panic() {
        init_subscriber("warn");
        init_subscriber("debug");
    }

    #[test]
    fn targets_are_namespaced() {
        assert!(DEBUGGEE_TARGET.starts_with("sedap::"));
        assert!(NOTIFY_TARGET.starts_with("sedap::"));
    }
}
