//! Seams between the bridge and its host.
//!
//! The host supplies a [`SessionPort`] (the debuggee connection), a
//! [`UiPort`] plus a [`UiInbound`] stream (the panel connection) and a
//! [`Notifier`] (user-visible messages). Session events reach bridges through
//! [`SessionSignal`]s on a single channel drained by [`crate::EventPump`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use sedap_protocol::{BridgeMessage, UiMessage};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::SessionError;

/// Request side of a debuggee session.
#[async_trait]
pub trait SessionPort: Send + Sync + 'static {
    /// Issue a custom request and wait for its single response.
    ///
    /// JSON `null` means the session returned nothing. Timeouts, if any, are
    /// the port's business.
    async fn send_request(&self, command: &str, arguments: Value) -> Result<Value, SessionError>;
}

/// Shared handle to a live session, compared by identity.
///
/// Two handles are the same session only if they point at the same port
/// object; two ports that happen to be equal in value are different sessions.
#[derive(Clone)]
pub struct SessionHandle(Arc<dyn SessionPort>);

impl SessionHandle {
    /// Wrap a session port.
    pub fn new(port: Arc<dyn SessionPort>) -> Self {
        Self(port)
    }

    /// Identity comparison.
    pub fn is_same(&self, other: &SessionHandle) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// Forward a request to the underlying port.
    pub async fn send_request(
        &self,
        command: &str,
        arguments: Value,
    ) -> Result<Value, SessionError> {
        self.0.send_request(command, arguments).await
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionHandle")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// A named custom event pushed by a session.
#[derive(Clone, Debug)]
pub struct SessionEvent {
    /// Session that emitted the event.
    pub session: SessionHandle,
    /// Event name.
    pub event: String,
    /// Opaque body; `null` when absent.
    pub body: Value,
}

/// Everything a session tells the process-wide event pump.
#[derive(Clone, Debug)]
pub enum SessionSignal {
    /// A custom event to route to matching bridges.
    Custom(SessionEvent),
    /// The session ended; matching bridges must be disposed.
    Terminated(SessionHandle),
}

/// Sending half of the session signal channel.
pub type SignalSender = mpsc::UnboundedSender<SessionSignal>;
/// Receiving half of the session signal channel.
pub type SignalReceiver = mpsc::UnboundedReceiver<SessionSignal>;

/// Create the session signal channel.
pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}

/// Outbound side of a panel connection.
pub trait UiPort: Send + Sync + 'static {
    /// Post a message without waiting for acknowledgment.
    ///
    /// Returns `false` if the panel could not accept it.
    fn post(&self, message: &BridgeMessage) -> bool;
}

/// Inbound panel messages. The end of the stream is the panel-closed
/// notification.
pub type UiInbound = BoxStream<'static, UiMessage>;

/// User-visible notifications.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync + 'static {
    /// Show a human-readable error.
    fn show_error(&self, message: &str);
}
