//! End-to-end bridge behaviour through the inbound stream and signal pump.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use sedap_bridge::testing::{FakeSession, RecordingNotifier, RecordingUi};
use sedap_bridge::{
    Bridge, BridgeState, EventPump, SessionEvent, SessionHandle, SessionRegistry, SessionSignal,
    signal_channel,
};
use sedap_protocol::{BridgeMessage, DebuggerState, UiMessage};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::UnboundedReceiverStream;

struct Panel {
    bridge: Arc<Bridge>,
    inbound: mpsc::UnboundedSender<UiMessage>,
    outbound: mpsc::UnboundedReceiver<BridgeMessage>,
}

fn open_panel(registry: &Arc<SessionRegistry>, session: &SessionHandle) -> Panel {
    let (ui, outbound) = RecordingUi::new();
    let (inbound, rx) = mpsc::unbounded_channel();
    let bridge = Bridge::attach(
        registry,
        session.clone(),
        Arc::new(ui),
        UnboundedReceiverStream::new(rx).boxed(),
        Arc::new(RecordingNotifier::new()),
        false,
    );
    Panel {
        bridge,
        inbound,
        outbound,
    }
}

async fn next_message(panel: &mut Panel) -> BridgeMessage {
    timeout(Duration::from_secs(1), panel.outbound.recv())
        .await
        .expect("panel message")
        .expect("channel open")
}

async fn wait_disposed(bridge: &Bridge) {
    timeout(Duration::from_secs(1), async {
        while bridge.state() != BridgeState::Disposed {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("bridge disposed");
}

#[tokio::test]
async fn inbound_request_is_answered() {
    let registry = Arc::new(SessionRegistry::new());
    let port = Arc::new(FakeSession::new());
    port.push_ok("debuggerState", json!({"currentProc": "main"}));
    let session = SessionHandle::new(port.clone());
    let mut panel = open_panel(&registry, &session);

    panel.inbound.send(UiMessage::RequestStateUpdate).unwrap();

    assert_eq!(
        next_message(&mut panel).await,
        BridgeMessage::StateUpdate {
            state: DebuggerState(json!({"currentProc": "main"}))
        }
    );
}

#[tokio::test]
async fn overlapping_requests_complete_out_of_order() {
    let registry = Arc::new(SessionRegistry::new());
    let port = Arc::new(FakeSession::new());
    let first = port.push_deferred("debuggerState");
    let second = port.push_deferred("debuggerState");
    let session = SessionHandle::new(port.clone());
    let mut panel = open_panel(&registry, &session);

    panel.inbound.send(UiMessage::RequestStateUpdate).unwrap();
    panel.inbound.send(UiMessage::RequestStateUpdate).unwrap();
    timeout(Duration::from_secs(1), async {
        while port.calls().len() < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("both requests issued");

    second.send(Ok(json!({"answer": 2}))).unwrap();
    assert_eq!(
        next_message(&mut panel).await,
        BridgeMessage::StateUpdate {
            state: DebuggerState(json!({"answer": 2}))
        }
    );

    first.send(Ok(json!({"answer": 1}))).unwrap();
    assert_eq!(
        next_message(&mut panel).await,
        BridgeMessage::StateUpdate {
            state: DebuggerState(json!({"answer": 1}))
        }
    );
}

#[tokio::test]
async fn failed_request_does_not_stop_inbound_loop() {
    let registry = Arc::new(SessionRegistry::new());
    let port = Arc::new(FakeSession::new());
    port.push_ok("debuggerState", json!({"ok": true}));
    let session = SessionHandle::new(port.clone());
    let mut panel = open_panel(&registry, &session);

    // No scripted reply for "jump": the session rejects it.
    panel
        .inbound
        .send(UiMessage::RequestJump { cmd_id: 1 })
        .unwrap();
    panel.inbound.send(UiMessage::RequestStateUpdate).unwrap();

    assert_eq!(
        next_message(&mut panel).await,
        BridgeMessage::StateUpdate {
            state: DebuggerState(json!({"ok": true}))
        }
    );
    assert_eq!(panel.bridge.state(), BridgeState::Active);
}

#[tokio::test]
async fn panel_close_then_session_end_disposes_once() {
    let registry = Arc::new(SessionRegistry::new());
    let session = SessionHandle::new(Arc::new(FakeSession::new()));
    let panel = open_panel(&registry, &session);
    let bridge = panel.bridge.clone();

    drop(panel);
    wait_disposed(&bridge).await;
    assert!(registry.is_empty());

    assert_eq!(registry.terminate(&session), 0);
    assert!(!bridge.dispose());
}

#[tokio::test]
async fn events_route_by_session_identity_through_pump() {
    let registry = Arc::new(SessionRegistry::new());
    let s1 = SessionHandle::new(Arc::new(FakeSession::new()));
    let s2 = SessionHandle::new(Arc::new(FakeSession::new()));
    let mut p1 = open_panel(&registry, &s1);
    let mut p2 = open_panel(&registry, &s2);

    let (tx, rx) = signal_channel();
    let pump = tokio::spawn(EventPump::new(rx, registry.clone()).run());

    tx.send(SessionSignal::Custom(SessionEvent {
        session: s2.clone(),
        event: "debugStateUpdate".into(),
        body: json!({"from": 2}),
    }))
    .unwrap();

    assert_eq!(
        next_message(&mut p2).await,
        BridgeMessage::StateUpdate {
            state: DebuggerState(json!({"from": 2}))
        }
    );
    assert!(p1.outbound.try_recv().is_err());

    tx.send(SessionSignal::Terminated(s1)).unwrap();
    wait_disposed(&p1.bridge).await;
    assert_eq!(p2.bridge.state(), BridgeState::Active);
    assert_eq!(registry.len(), 1);

    drop(tx);
    timeout(Duration::from_secs(1), pump)
        .await
        .expect("pump exits")
        .unwrap();
}

#[tokio::test]
async fn session_end_stops_inbound_handling() {
    let registry = Arc::new(SessionRegistry::new());
    let port = Arc::new(FakeSession::new());
    let session = SessionHandle::new(port.clone());
    let panel = open_panel(&registry, &session);

    assert_eq!(registry.terminate(&session), 1);
    tokio::task::yield_now().await;

    // The inbound loop has exited, so the stream's receiver is gone.
    assert!(
        timeout(Duration::from_secs(1), panel.inbound.closed())
            .await
            .is_ok()
    );
    assert!(port.calls().is_empty());
}
