//! DAP client acting as a session port.
//!
//! Two tasks per client: a writer draining an unbounded queue into the
//! framed sink, and a reader resolving responses by `request_seq` and turning
//! events into [`SessionSignal`]s. Requests never wait on each other; any
//! number may be in flight.
//!
//! A `terminated` event ends the session: the client signals it once, sends
//! `disconnect`, and closes the transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use sedap_bridge::{SessionError, SessionEvent, SessionHandle, SessionPort, SessionSignal, SignalSender};
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::codec::{DEFAULT_MAX_FRAME, DapCodec};
use crate::message::{Event, ProtocolMessage, Request, Response, STANDARD_EVENTS, TERMINATED_EVENT};

/// How long [`DapClient::close`] waits for the `disconnect` response.
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Tunables for a [`DapClient`].
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Per-request timeout; `None` waits forever.
    pub request_timeout: Option<Duration>,
    /// Largest accepted frame body.
    pub max_frame: usize,
    /// Wait for the `disconnect` response before closing anyway.
    pub disconnect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: None,
            max_frame: DEFAULT_MAX_FRAME,
            disconnect_timeout: DEFAULT_DISCONNECT_TIMEOUT,
        }
    }
}

/// A connected debug adapter.
pub struct DapClient {
    seq: AtomicI64,
    pending: Mutex<HashMap<i64, oneshot::Sender<Response>>>,
    outbound: mpsc::UnboundedSender<ProtocolMessage>,
    closed: CancellationToken,
    disconnecting: AtomicBool,
    request_timeout: Option<Duration>,
    disconnect_timeout: Duration,
}

impl DapClient {
    /// Start a client with default options.
    pub fn start<R, W>(reader: R, writer: W, signals: SignalSender) -> (Arc<Self>, SessionHandle)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::start_with_options(reader, writer, signals, ClientOptions::default())
    }

    /// Start a client over `reader`/`writer`.
    ///
    /// Custom events and termination are pushed onto `signals`, tagged with
    /// the returned handle. Must be called within a Tokio runtime.
    pub fn start_with_options<R, W>(
        reader: R,
        writer: W,
        signals: SignalSender,
        options: ClientOptions,
    ) -> (Arc<Self>, SessionHandle)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let client = Arc::new(Self {
            seq: AtomicI64::new(1),
            pending: Mutex::new(HashMap::new()),
            outbound,
            closed: CancellationToken::new(),
            disconnecting: AtomicBool::new(false),
            request_timeout: options.request_timeout,
            disconnect_timeout: options.disconnect_timeout,
        });
        let handle = SessionHandle::new(client.clone());

        let frames_out = FramedWrite::new(writer, DapCodec::with_max_frame(options.max_frame));
        drop(tokio::spawn(write_loop(
            frames_out,
            outbound_rx,
            client.closed.clone(),
        )));

        let frames_in = FramedRead::new(reader, DapCodec::with_max_frame(options.max_frame));
        drop(tokio::spawn(read_loop(
            client.clone(),
            frames_in,
            handle.clone(),
            signals,
        )));

        (client, handle)
    }

    /// Whether the transport has closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Send `disconnect`, then close the transport. Pending requests fail
    /// with [`SessionError::Closed`].
    ///
    /// The `disconnect` is best effort: a rejection, a closed transport or no
    /// answer within the disconnect timeout still closes. Concurrent calls
    /// send one `disconnect` and all return once the transport is closed.
    pub async fn close(&self) {
        if self.is_closed() {
            return;
        }
        if self.disconnecting.swap(true, Ordering::AcqRel) {
            self.closed().await;
            return;
        }
        let disconnect = self.request("disconnect", json!({"restart": false}));
        match tokio::time::timeout(self.disconnect_timeout, disconnect).await {
            Ok(Ok(_)) => debug!("adapter acknowledged disconnect"),
            Ok(Err(e)) => debug!(error = %e, "disconnect not acknowledged"),
            Err(_) => warn!(
                timeout_ms = u64::try_from(self.disconnect_timeout.as_millis()).unwrap_or(u64::MAX),
                "adapter did not answer disconnect, closing anyway"
            ),
        }
        self.abort();
    }

    /// Close the transport without telling the adapter.
    pub fn abort(&self) {
        self.closed.cancel();
    }

    /// Resolves once the transport has closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Issue a request and wait for its response body (`null` if absent).
    pub async fn request(&self, command: &str, arguments: Value) -> Result<Value, SessionError> {
        let seq = self.next_seq();
        let (tx, rx) = oneshot::channel();
        let _ = self.pending.lock().insert(seq, tx);
        // Checked after parking the sender so a concurrent close either
        // drains this entry or is seen here.
        if self.closed.is_cancelled() {
            let _ = self.pending.lock().remove(&seq);
            return Err(SessionError::Closed);
        }

        let message = ProtocolMessage::Request(Request {
            seq,
            command: command.to_owned(),
            arguments,
        });
        if self.outbound.send(message).is_err() {
            let _ = self.pending.lock().remove(&seq);
            return Err(SessionError::Closed);
        }
        debug!(seq, command, "request sent");

        let response = match self.request_timeout {
            Some(limit) => {
                if let Ok(reply) = tokio::time::timeout(limit, rx).await {
                    reply
                } else {
                    let _ = self.pending.lock().remove(&seq);
                    return Err(SessionError::Timeout {
                        command: command.to_owned(),
                        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    });
                }
            }
            None => rx.await,
        }
        .map_err(|_| SessionError::Closed)?;

        if !response.success {
            return Err(SessionError::Rejected {
                command: command.to_owned(),
                message: response
                    .message
                    .unwrap_or_else(|| "request failed".to_owned()),
            });
        }
        Ok(response.body.unwrap_or(Value::Null))
    }

    /// Run the start-up sequence: `initialize`, then `launch` or `attach`
    /// together with `configurationDone`.
    ///
    /// Some adapters answer the start request only after configuration is
    /// done, so the last two are in flight at once. Returns the adapter's
    /// capabilities.
    pub async fn handshake(
        &self,
        adapter_id: &str,
        start_command: &str,
        arguments: Value,
    ) -> Result<Value, SessionError> {
        let capabilities = self
            .request(
                "initialize",
                json!({
                    "clientID": "sedap",
                    "adapterID": adapter_id,
                    "linesStartAt1": true,
                    "columnsStartAt1": true,
                    "pathFormat": "path",
                }),
            )
            .await?;
        let _ = tokio::try_join!(
            self.request(start_command, arguments),
            self.request("configurationDone", Value::Null),
        )?;
        info!(adapter_id, start_command, "adapter handshake complete");
        Ok(capabilities)
    }

    fn next_seq(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn resolve(&self, response: Response) {
        let waiter = self.pending.lock().remove(&response.request_seq);
        match waiter {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => debug!(
                request_seq = response.request_seq,
                command = %response.command,
                "response for unknown request"
            ),
        }
    }

    fn refuse_reverse_request(&self, request: &Request) {
        warn!(command = %request.command, seq = request.seq, "refusing reverse request");
        let reply = ProtocolMessage::Response(Response {
            seq: self.next_seq(),
            request_seq: request.seq,
            success: false,
            command: request.command.clone(),
            message: Some("reverse requests are not supported".to_owned()),
            body: None,
        });
        let _ = self.outbound.send(reply);
    }

    /// Mark closed and fail everything in flight.
    fn shut_down(&self) {
        self.closed.cancel();
        let drained: Vec<_> = self.pending.lock().drain().collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "failing pending requests");
        }
    }
}

#[async_trait]
impl SessionPort for DapClient {
    async fn send_request(&self, command: &str, arguments: Value) -> Result<Value, SessionError> {
        self.request(command, arguments).await
    }
}

impl std::fmt::Debug for DapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DapClient")
            .field("pending", &self.pending.lock().len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[instrument(skip_all, name = "dap_writer")]
async fn write_loop<W>(
    mut frames: FramedWrite<W, DapCodec>,
    mut rx: mpsc::UnboundedReceiver<ProtocolMessage>,
    closed: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            () = closed.cancelled() => break,
            next = rx.recv() => {
                let Some(message) = next else { break };
                if let Err(e) = frames.send(message).await {
                    warn!(error = %e, "write failed, closing transport");
                    closed.cancel();
                    break;
                }
            }
        }
    }
    debug!("writer exiting");
}

#[instrument(skip_all, name = "dap_reader")]
async fn read_loop<R>(
    client: Arc<DapClient>,
    mut frames: FramedRead<R, DapCodec>,
    session: SessionHandle,
    signals: SignalSender,
) where
    R: AsyncRead + Unpin,
{
    let mut terminated = false;
    loop {
        let next = tokio::select! {
            () = client.closed.cancelled() => break,
            next = frames.next() => next,
        };
        match next {
            Some(Ok(ProtocolMessage::Response(response))) => client.resolve(response),
            Some(Ok(ProtocolMessage::Event(event))) => {
                if route_event(event, &session, &signals, &mut terminated) {
                    let client = Arc::clone(&client);
                    drop(tokio::spawn(async move { client.close().await }));
                }
            }
            Some(Ok(ProtocolMessage::Request(request))) => client.refuse_reverse_request(&request),
            Some(Err(e)) => {
                warn!(error = %e, "transport error");
                break;
            }
            None => {
                info!("adapter closed the connection");
                break;
            }
        }
    }
    client.shut_down();
    if !terminated {
        let _ = signals.send(SessionSignal::Terminated(session));
    }
}

/// Returns `true` for the event that ends the session.
fn route_event(event: Event, session: &SessionHandle, signals: &SignalSender, terminated: &mut bool) -> bool {
    let name = event.event.as_str();
    if name == TERMINATED_EVENT {
        if *terminated {
            return false;
        }
        *terminated = true;
        info!("session terminated by adapter");
        let _ = signals.send(SessionSignal::Terminated(session.clone()));
        return true;
    }
    if STANDARD_EVENTS.contains(&name) {
        debug!(event = name, seq = event.seq, "adapter event");
        return false;
    }
    let _ = signals.send(SessionSignal::Custom(SessionEvent {
        session: session.clone(),
        event: event.event,
        body: event.body.unwrap_or(Value::Null),
    }));
    false
}
