//! # sedap-protocol
//!
//! Wire vocabulary of the debugger bridge.
//!
//! - [`UiMessage`] / [`BridgeMessage`]: the two closed unions exchanged with
//!   the rendering surface, tagged by a `type` field
//! - [`session`]: custom request names, argument and result records, and the
//!   custom events a debuggee session pushes
//! - [`DebuggerState`], [`UnifyMap`], [`BranchCase`]: opaque payloads carried
//!   through unexamined
//!
//! Field names match the JSON the panel and the debug adapter exchange
//! exactly (`cmdId`, `prevId`, `branchCase`, `unifyId`, ...).

#![deny(unsafe_code)]

pub mod errors;
pub mod opaque;
pub mod session;
pub mod ui;

pub use errors::ProtocolError;
pub use opaque::{BranchCase, DebuggerState, UnifyMap};
pub use ui::{BridgeMessage, UiMessage};
