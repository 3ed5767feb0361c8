//! Panel session lifecycle: one WebSocket from upgrade to close.

use std::future::{Future, ready};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, StreamExt};
use sedap_bridge::{Bridge, SessionHandle, UiInbound};
use sedap_core::ConnectionId;
use sedap_protocol::UiMessage;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::connection::PanelConnection;
use crate::server::AppState;

/// Run one panel connection bound to `session`.
///
/// 1. Pairs the socket with a new bridge and asks it to reset the view
/// 2. Feeds decoded inbound frames to the bridge until a Close frame, an
///    error or the end of the stream
/// 3. Forwards queued outbound messages until the bridge is disposed, then
///    flushes what is still queued and closes the socket
#[instrument(skip_all, fields(connection_id = %connection_id))]
pub async fn run_panel_session(
    socket: WebSocket,
    connection_id: ConnectionId,
    session: SessionHandle,
    state: AppState,
) {
    let (mut ws_tx, ws_rx) = socket.split();
    let (send_tx, mut send_rx) = mpsc::channel::<String>(state.config.ui_channel_capacity);
    let connection = Arc::new(PanelConnection::new(connection_id.clone(), send_tx));

    let bridge = Bridge::attach(
        &state.registry,
        session,
        connection.clone(),
        inbound_stream(ws_rx),
        state.notifier.clone(),
        state.config.log_enabled,
    );
    info!(bridge_id = bridge.id().get(), "panel connected");
    bridge.reset_view();

    forward_outbound(&mut ws_tx, &mut send_rx, bridge.closed()).await;

    let _ = bridge.dispose();
    let _ = ws_tx.send(Message::Close(None)).await;
    info!(
        bridge_id = bridge.id().get(),
        dropped = connection.drop_count(),
        age_ms = u64::try_from(connection.age().as_millis()).unwrap_or(u64::MAX),
        "panel disconnected"
    );
}

/// Write queued messages to `sink` until `closed` resolves or the socket
/// fails. Messages queued before `closed` resolved are still written.
async fn forward_outbound<S>(
    sink: &mut S,
    send_rx: &mut mpsc::Receiver<String>,
    closed: impl Future<Output = ()>,
) where
    S: Sink<Message> + Unpin,
{
    tokio::pin!(closed);
    loop {
        tokio::select! {
            () = &mut closed => break,
            next = send_rx.recv() => {
                let Some(text) = next else { return };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    debug!("socket write failed");
                    return;
                }
            }
        }
    }
    while let Ok(text) = send_rx.try_recv() {
        if sink.send(Message::Text(text.into())).await.is_err() {
            debug!("socket write failed while flushing");
            return;
        }
    }
}

/// Panel frames as bridge input. The stream ends at the first Close frame
/// or socket error; undecodable frames are dropped.
fn inbound_stream<S>(frames: S) -> UiInbound
where
    S: futures::Stream<Item = Result<Message, axum::Error>> + Send + 'static,
{
    frames
        .take_while(|frame| ready(matches!(frame, Ok(msg) if !matches!(msg, Message::Close(_)))))
        .filter_map(|frame| ready(frame.ok().and_then(decode_frame)))
        .boxed()
}

/// Decode one text or UTF-8 binary frame.
pub fn decode_frame(frame: Message) -> Option<UiMessage> {
    let text = match &frame {
        Message::Text(text) => text.as_str(),
        Message::Binary(data) => {
            if let Ok(text) = std::str::from_utf8(data) {
                text
            } else {
                warn!(len = data.len(), "dropping non-UTF-8 binary frame");
                return None;
            }
        }
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => return None,
    };
    match UiMessage::from_json(text) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!(error = %e, "dropping undecodable panel frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sedap_core::logging::capture_logs;
    use tracing::Level;

    #[test]
    fn text_frame_decodes() {
        let msg = decode_frame(Message::Text(r#"{"type":"request_jump","cmdId":4}"#.into()));
        assert_eq!(msg, Some(UiMessage::RequestJump { cmd_id: 4 }));
    }

    #[test]
    fn binary_utf8_frame_decodes() {
        let msg = decode_frame(Message::Binary(
            br#"{"type":"request_state_update"}"#.to_vec().into(),
        ));
        assert_eq!(msg, Some(UiMessage::RequestStateUpdate));
    }

    #[test]
    fn unknown_tag_is_dropped_with_warning() {
        let (logs, _guard) = capture_logs();
        let msg = decode_frame(Message::Text(r#"{"type":"request_teleport"}"#.into()));
        assert_eq!(msg, None);
        assert!(logs.has_event(Level::WARN, "dropping undecodable panel frame"));
    }

    #[test]
    fn non_utf8_binary_is_dropped() {
        let msg = decode_frame(Message::Binary(vec![0xff, 0xfe].into()));
        assert_eq!(msg, None);
    }

    #[test]
    fn control_frames_are_ignored() {
        assert_eq!(decode_frame(Message::Ping(Vec::new().into())), None);
        assert_eq!(decode_frame(Message::Close(None)), None);
    }

    #[tokio::test]
    async fn queued_messages_are_flushed_after_close() {
        let (send_tx, mut send_rx) = mpsc::channel(8);
        send_tx.try_send(r#"{"type":"state_update","state":{"n":1}}"#.to_owned()).unwrap();
        send_tx.try_send(r#"{"type":"state_update","state":{"n":2}}"#.to_owned()).unwrap();
        let (mut sink, written) = futures::channel::mpsc::unbounded::<Message>();

        forward_outbound(&mut sink, &mut send_rx, ready(())).await;
        drop(sink);

        let texts: Vec<String> = written
            .map(|m| match m {
                Message::Text(text) => text.as_str().to_owned(),
                other => panic!("unexpected frame {other:?}"),
            })
            .collect()
            .await;
        assert_eq!(
            texts,
            vec![
                r#"{"type":"state_update","state":{"n":1}}"#,
                r#"{"type":"state_update","state":{"n":2}}"#,
            ]
        );
    }

    #[tokio::test]
    async fn forwarding_stops_when_queue_closes() {
        let (send_tx, mut send_rx) = mpsc::channel::<String>(1);
        drop(send_tx);
        let (mut sink, _written) = futures::channel::mpsc::unbounded::<Message>();

        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            forward_outbound(&mut sink, &mut send_rx, futures::future::pending()),
        )
        .await
        .expect("returns once the queue is closed");
    }

    #[tokio::test]
    async fn inbound_stream_stops_at_close() {
        let frames = futures::stream::iter(vec![
            Ok(Message::Text(r#"{"type":"request_state_update"}"#.into())),
            Ok(Message::Text("garbage".into())),
            Ok(Message::Text(r#"{"type":"request_unification","id":3}"#.into())),
            Ok(Message::Close(None)),
            Ok(Message::Text(r#"{"type":"request_state_update"}"#.into())),
        ]);
        let decoded: Vec<UiMessage> = inbound_stream(frames).collect().await;
        assert_eq!(
            decoded,
            vec![
                UiMessage::RequestStateUpdate,
                UiMessage::RequestUnification { id: 3 },
            ]
        );
    }
}
