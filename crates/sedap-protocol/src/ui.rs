//! Messages exchanged with the rendering surface.

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;
use crate::opaque::{BranchCase, DebuggerState, UnifyMap};

/// Message sent by the panel to the bridge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum UiMessage {
    /// Ask for a fresh full snapshot.
    RequestStateUpdate,
    /// Move execution back to a prior command.
    RequestJump {
        /// Command to jump to.
        cmd_id: i64,
    },
    /// Execute one specific successor of a command.
    RequestExecSpecific {
        /// Command whose successor is executed.
        prev_id: i64,
        /// Which successor; absent or `null` selects none.
        #[serde(default)]
        branch_case: Option<BranchCase>,
    },
    /// Fetch unification data.
    RequestUnification {
        /// Requested unification id.
        id: i64,
    },
    /// Start executing a named procedure.
    RequestStartProc {
        /// Procedure name.
        proc_name: String,
    },
}

impl UiMessage {
    /// Decode a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::InvalidUiMessage)
    }

    /// Wire tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestStateUpdate => "request_state_update",
            Self::RequestJump { .. } => "request_jump",
            Self::RequestExecSpecific { .. } => "request_exec_specific",
            Self::RequestUnification { .. } => "request_unification",
            Self::RequestStartProc { .. } => "request_start_proc",
        }
    }
}

/// Message sent by the bridge to the panel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BridgeMessage {
    /// Replace the panel's current state.
    StateUpdate {
        /// The new snapshot.
        state: DebuggerState,
    },
    /// Deliver fetched unification data.
    UnifyUpdate {
        /// Id the session actually bound, which may differ from the one requested.
        unify_id: i64,
        /// The unification data.
        unify_map: UnifyMap,
    },
    /// Discard transient view-local state.
    ResetView,
}

impl BridgeMessage {
    /// Wire tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateUpdate { .. } => "state_update",
            Self::UnifyUpdate { .. } => "unify_update",
            Self::ResetView => "reset_view",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::{Value, json};

    #[test]
    fn decode_state_update_request() {
        let msg = UiMessage::from_json(r#"{"type":"request_state_update"}"#).unwrap();
        assert_eq!(msg, UiMessage::RequestStateUpdate);
        assert_eq!(msg.kind(), "request_state_update");
    }

    #[test]
    fn decode_jump_uses_camel_case() {
        let msg = UiMessage::from_json(r#"{"type":"request_jump","cmdId":12}"#).unwrap();
        assert_eq!(msg, UiMessage::RequestJump { cmd_id: 12 });
    }

    #[test]
    fn decode_exec_specific_with_branch_case() {
        let msg = UiMessage::from_json(
            r#"{"type":"request_exec_specific","prevId":4,"branchCase":{"kind":"then"}}"#,
        )
        .unwrap();
        assert_matches!(
            msg,
            UiMessage::RequestExecSpecific { prev_id: 4, branch_case: Some(case) }
                if case.as_value() == &json!({"kind": "then"})
        );
    }

    #[test]
    fn exec_specific_branch_case_null_or_missing_is_none() {
        let null = UiMessage::from_json(
            r#"{"type":"request_exec_specific","prevId":4,"branchCase":null}"#,
        )
        .unwrap();
        let missing = UiMessage::from_json(r#"{"type":"request_exec_specific","prevId":4}"#).unwrap();
        let expected = UiMessage::RequestExecSpecific {
            prev_id: 4,
            branch_case: None,
        };
        assert_eq!(null, expected);
        assert_eq!(missing, expected);
    }

    #[test]
    fn decode_start_proc() {
        let msg =
            UiMessage::from_json(r#"{"type":"request_start_proc","procName":"main"}"#).unwrap();
        assert_eq!(
            msg,
            UiMessage::RequestStartProc {
                proc_name: "main".into()
            }
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = UiMessage::from_json(r#"{"type":"request_everything"}"#).unwrap_err();
        assert_matches!(err, ProtocolError::InvalidUiMessage(_));
    }

    #[test]
    fn missing_payload_is_rejected() {
        assert!(UiMessage::from_json(r#"{"type":"request_unification"}"#).is_err());
    }

    #[test]
    fn encode_state_update() {
        let msg = BridgeMessage::StateUpdate {
            state: DebuggerState(json!({"currentProc": "p"})),
        };
        let v: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(v, json!({"type": "state_update", "state": {"currentProc": "p"}}));
    }

    #[test]
    fn encode_unify_update() {
        let msg = BridgeMessage::UnifyUpdate {
            unify_id: 9,
            unify_map: UnifyMap(json!({"x": 1})),
        };
        let v: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            v,
            json!({"type": "unify_update", "unifyId": 9, "unifyMap": {"x": 1}})
        );
        assert_eq!(msg.kind(), "unify_update");
    }

    #[test]
    fn encode_reset_view() {
        let v: Value = serde_json::to_value(BridgeMessage::ResetView).unwrap();
        assert_eq!(v, json!({"type": "reset_view"}));
    }
}
