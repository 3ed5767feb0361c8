//! Outbound half of a panel connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use sedap_bridge::UiPort;
use sedap_core::ConnectionId;
use sedap_protocol::BridgeMessage;
use tokio::sync::mpsc;
use tracing::warn;

/// A connected panel, seen from the bridge.
///
/// Posting serializes the message and queues it for the socket writer
/// without waiting. A full or closed queue drops the message.
pub struct PanelConnection {
    id: ConnectionId,
    tx: mpsc::Sender<String>,
    connected_at: Instant,
    dropped_messages: AtomicU64,
}

impl PanelConnection {
    /// Create a connection feeding `tx`.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Connection id.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    fn send(&self, text: String) -> bool {
        if self.tx.try_send(text).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }
}

impl UiPort for PanelConnection {
    fn post(&self, message: &BridgeMessage) -> bool {
        match serde_json::to_string(message) {
            Ok(text) => self.send(text),
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "failed to serialize panel message");
                false
            }
        }
    }
}
