//! WebSocket UI port.

pub mod connection;
pub mod session;
