//! Custom requests the bridge issues to the debuggee session, and the custom
//! events the session pushes back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;
use crate::opaque::{BranchCase, DebuggerState, UnifyMap};

// ── Request names ───────────────────────────────────────────────────

/// Fetch the current [`DebuggerState`].
pub const DEBUGGER_STATE: &str = "debuggerState";
/// Fetch unification data for an id.
pub const UNIFICATION: &str = "unification";
/// Jump to a prior command.
pub const JUMP: &str = "jump";
/// Execute a specific successor.
pub const STEP_SPECIFIC: &str = "stepSpecific";
/// Start a named procedure.
pub const START_PROC: &str = "startProc";

// ── Event names ─────────────────────────────────────────────────────

/// Diagnostic line from the debuggee.
pub const LOG_EVENT: &str = "log";
/// Spontaneous state snapshot.
pub const DEBUG_STATE_UPDATE_EVENT: &str = "debugStateUpdate";

// ── Request arguments ───────────────────────────────────────────────

/// Arguments of [`UNIFICATION`] and [`JUMP`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdArgs {
    /// Unification id or command id.
    pub id: i64,
}

/// Arguments of [`STEP_SPECIFIC`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSpecificArgs {
    /// Command whose successor is executed.
    pub prev_id: i64,
    /// Successor selector, serialized as `null` when absent.
    pub branch_case: Option<BranchCase>,
}

/// Arguments of [`START_PROC`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartProcArgs {
    /// Procedure name.
    pub proc_name: String,
}

// ── Request results ─────────────────────────────────────────────────

/// Result of [`UNIFICATION`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnificationResult {
    /// Id the session bound; authoritative over the requested id.
    pub unify_id: i64,
    /// The unification data.
    pub unify_map: UnifyMap,
}

/// Result of the execution-control requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the session performed the command.
    pub success: bool,
    /// Failure reason, if the session gave one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl CommandResult {
    /// The message to show the user, or `None` on success.
    ///
    /// An absent or empty `err` falls back to `fallback`.
    pub fn failure_message(&self, fallback: &str) -> Option<String> {
        if self.success {
            return None;
        }
        Some(
            self.err
                .as_deref()
                .filter(|e| !e.is_empty())
                .unwrap_or(fallback)
                .to_owned(),
        )
    }
}

/// Execution-control requests sharing the `{success, err?}` result shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// [`JUMP`]
    Jump,
    /// [`STEP_SPECIFIC`]
    StepSpecific,
    /// [`START_PROC`]
    StartProc,
}

impl Command {
    /// Request name on the wire.
    pub fn request_name(self) -> &'static str {
        match self {
            Self::Jump => JUMP,
            Self::StepSpecific => STEP_SPECIFIC,
            Self::StartProc => START_PROC,
        }
    }

    /// Notification text used when the session fails without a reason.
    pub fn fallback_error(self) -> &'static str {
        match self {
            Self::Jump => "jumpToCmd: unknown error",
            Self::StepSpecific => "execSpecificCmd: unknown error",
            Self::StartProc => "startProc: unknown error",
        }
    }
}

/// Decode a request result, treating JSON `null` as "nothing returned".
pub fn decode_result<T>(request: &'static str, value: Value) -> Result<Option<T>, ProtocolError>
where
    T: serde::de::DeserializeOwned,
{
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| ProtocolError::InvalidResult { request, source })
}

// ── Events ──────────────────────────────────────────────────────────

/// Body of a [`LOG_EVENT`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// The line to print.
    pub msg: String,
    /// Structured payload; an empty object means "none".
    #[serde(default)]
    pub json: Value,
}

impl LogEvent {
    /// The structured payload, or `None` when it carries nothing.
    pub fn payload(&self) -> Option<&Value> {
        match &self.json {
            Value::Null => None,
            Value::Object(map) if map.is_empty() => None,
            Value::Array(items) if items.is_empty() => None,
            other => Some(other),
        }
    }
}

/// A custom event decoded by name.
#[derive(Clone, Debug, PartialEq)]
pub enum CustomEvent {
    /// Diagnostic line.
    Log(LogEvent),
    /// Spontaneous snapshot.
    DebugStateUpdate(DebuggerState),
    /// Any other event name.
    Unhandled(String),
}

impl CustomEvent {
    /// Decode an event by name. Unknown names are not an error.
    pub fn decode(name: &str, body: Value) -> Result<Self, ProtocolError> {
        let invalid = |source| ProtocolError::InvalidEventBody {
            event: name.to_owned(),
            source,
        };
        match name {
            LOG_EVENT => serde_json::from_value(body).map(Self::Log).map_err(invalid),
            DEBUG_STATE_UPDATE_EVENT => Ok(Self::DebugStateUpdate(DebuggerState(body))),
            other => Ok(Self::Unhandled(other.to_owned())),
        }
    }
}
