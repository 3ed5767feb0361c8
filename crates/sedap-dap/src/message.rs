//! DAP envelopes.
//!
//! Only the envelope is typed. Arguments and bodies stay raw JSON: custom
//! requests and events are opaque to this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Any message on the wire, discriminated by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolMessage {
    /// Client-to-adapter request, or a reverse request from the adapter.
    Request(Request),
    /// Answer to a request.
    Response(Response),
    /// Spontaneous notification.
    Event(Event),
}

/// A request envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Sender-assigned sequence number.
    pub seq: i64,
    /// Request name.
    pub command: String,
    /// Request arguments; omitted on the wire when `null`.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub arguments: Value,
}

/// A response envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Sender-assigned sequence number.
    pub seq: i64,
    /// `seq` of the request being answered.
    pub request_seq: i64,
    /// Whether the request succeeded.
    pub success: bool,
    /// Request name.
    pub command: String,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Result; `None` when absent or `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// An event envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sender-assigned sequence number.
    pub seq: i64,
    /// Event name.
    pub event: String,
    /// Event body; `None` when absent or `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Events defined by the base protocol. These are consumed by the client and
/// never forwarded as custom events.
pub const STANDARD_EVENTS: &[&str] = &[
    "initialized",
    "stopped",
    "exited",
    "continued",
    "output",
    "breakpoint",
    "module",
    "loadedSource",
    "process",
    "thread",
    "capabilities",
    "progressStart",
    "progressUpdate",
    "progressEnd",
    "invalidated",
    "memory",
];

/// The event that ends the session. `exited` only reports that the
/// debuggee process ended; the adapter may still answer requests after it.
pub const TERMINATED_EVENT: &str = "terminated";
