//! Host notifier: user-visible errors go to the log.

use sedap_bridge::Notifier;
use sedap_core::logging::NOTIFY_TARGET;
use tracing::error;

/// Emits each notification as an `error` event on [`NOTIFY_TARGET`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show_error(&self, message: &str) {
        error!(target: NOTIFY_TARGET, "{message}");
    }
}
