//! The single consumer of session signals.
//!
//! Sessions never hold bridge references. They push [`SessionSignal`]s onto
//! one channel, and the pump routes each through the registry in arrival
//! order.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::ports::{SessionHandle, SessionSignal, SignalReceiver};
use crate::registry::SessionRegistry;

type TerminationHook = Box<dyn Fn(&SessionHandle) + Send + 'static>;

/// Drains session signals into the registry.
pub struct EventPump {
    rx: SignalReceiver,
    registry: Arc<SessionRegistry>,
    on_terminated: Option<TerminationHook>,
}

impl EventPump {
    /// Create a pump over `rx`.
    pub fn new(rx: SignalReceiver, registry: Arc<SessionRegistry>) -> Self {
        Self {
            rx,
            registry,
            on_terminated: None,
        }
    }

    /// Run `hook` after the bridges of a terminated session are disposed.
    #[must_use]
    pub fn on_terminated(mut self, hook: impl Fn(&SessionHandle) + Send + 'static) -> Self {
        self.on_terminated = Some(Box::new(hook));
        self
    }

    /// Run until every sender is dropped.
    #[instrument(skip_all, name = "event_pump")]
    pub async fn run(mut self) {
        while let Some(signal) = self.rx.recv().await {
            match signal {
                SessionSignal::Custom(event) => {
                    let delivered = self.registry.dispatch(&event);
                    debug!(event = %event.event, delivered, "custom event routed");
                }
                SessionSignal::Terminated(session) => {
                    let _ = self.registry.terminate(&session);
                    if let Some(hook) = &self.on_terminated {
                        hook(&session);
                    }
                }
            }
        }
        info!("signal sender closed, exiting");
    }
}
