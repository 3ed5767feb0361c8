//! # sedap-core
//!
//! Foundation types shared by every sedap crate:
//!
//! - **Ids**: [`BridgeId`] (registry key, monotonically assigned) and
//!   [`ConnectionId`] (one per UI surface connection)
//! - **Logging**: `tracing` subscriber bootstrap and in-memory capture for tests

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;

pub use ids::{BridgeId, ConnectionId};
