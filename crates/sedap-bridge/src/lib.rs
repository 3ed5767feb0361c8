//! # sedap-bridge
//!
//! Pairs one debuggee session with one debugger panel.
//!
//! - [`ports`]: the [`SessionPort`], [`UiPort`] and [`Notifier`] seams the host
//!   implements, plus [`SessionHandle`], the identity-compared session handle
//! - [`bridge::Bridge`]: translates panel requests into session requests and
//!   session events into panel messages; owns its subscriptions until disposed
//! - [`registry::SessionRegistry`]: bridge-id → bridge table; routes each
//!   session event to every bridge bound to the identical session
//! - [`pump::EventPump`]: the single process-wide consumer of session signals
//!
//! Panel requests are handled concurrently with no per-bridge queue: two
//! overlapping `request_state_update`s may be answered in either order.

#![deny(unsafe_code)]

pub mod bridge;
pub mod errors;
pub mod ports;
pub mod pump;
pub mod registry;
pub mod testing;

pub use bridge::{Bridge, BridgeState};
pub use errors::{BridgeError, SessionError};
pub use ports::{
    Notifier, SessionEvent, SessionHandle, SessionPort, SessionSignal, SignalReceiver,
    SignalSender, UiInbound, UiPort, signal_channel,
};
pub use pump::EventPump;
pub use registry::SessionRegistry;
