//! # sedap-dap
//!
//! A Debug Adapter Protocol client over any async byte stream.
//!
//! - [`codec::DapCodec`]: `Content-Length` framing as a `tokio_util` codec
//! - [`message`]: request, response and event envelopes
//! - [`client::DapClient`]: request/response correlation by `seq`, event
//!   forwarding as [`sedap_bridge::SessionSignal`]s; implements
//!   [`sedap_bridge::SessionPort`]

#![deny(unsafe_code)]

pub mod client;
pub mod codec;
pub mod errors;
pub mod message;

pub use client::{ClientOptions, DapClient};
pub use codec::DapCodec;
pub use errors::CodecError;
pub use message::{Event, ProtocolMessage, Request, Response};
