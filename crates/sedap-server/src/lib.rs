//! # sedap-server
//!
//! Axum host for debugger panels. Each WebSocket connection on `/ws` is one
//! UI port, paired with the active debug adapter session through a
//! [`sedap_bridge::Bridge`].

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod notifier;
pub mod server;
pub mod shutdown;
pub mod websocket;
