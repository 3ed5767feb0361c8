//! In-memory ports for tests.
//!
//! [`FakeSession`] answers requests from a per-command script, [`RecordingUi`]
//! forwards every posted message to a channel, and [`RecordingNotifier`]
//! keeps every notification.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sedap_protocol::BridgeMessage;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::errors::SessionError;
use crate::ports::{Notifier, SessionPort, UiPort};

type Reply = Result<Value, SessionError>;

enum Scripted {
    Ready(Reply),
    Deferred(oneshot::Receiver<Reply>),
}

/// Scripted session port.
///
/// Replies are queued per command and consumed in order. A command with no
/// queued reply is rejected.
#[derive(Default)]
pub struct FakeSession {
    script: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeSession {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn push_ok(&self, command: &str, value: Value) {
        self.push(command, Scripted::Ready(Ok(value)));
    }

    /// Queue a failed reply.
    pub fn push_err(&self, command: &str, error: SessionError) {
        self.push(command, Scripted::Ready(Err(error)));
    }

    /// Queue a reply that is released by the returned sender.
    pub fn push_deferred(&self, command: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.push(command, Scripted::Deferred(rx));
        tx
    }

    /// Every request issued so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    fn push(&self, command: &str, reply: Scripted) {
        self.script
            .lock()
            .entry(command.to_owned())
            .or_default()
            .push_back(reply);
    }
}

#[async_trait]
impl SessionPort for FakeSession {
    async fn send_request(&self, command: &str, arguments: Value) -> Result<Value, SessionError> {
        self.calls.lock().push((command.to_owned(), arguments));
        let next = self
            .script
            .lock()
            .get_mut(command)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Scripted::Ready(reply)) => reply,
            Some(Scripted::Deferred(rx)) => rx.await.unwrap_or(Err(SessionError::Closed)),
            None => Err(SessionError::Rejected {
                command: command.to_owned(),
                message: "no scripted reply".into(),
            }),
        }
    }
}

/// Panel port that forwards posted messages to a channel.
pub struct RecordingUi {
    tx: mpsc::UnboundedSender<BridgeMessage>,
    accepting: AtomicBool,
}

impl RecordingUi {
    /// Create the port and the receiver observing it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BridgeMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                accepting: AtomicBool::new(true),
            },
            rx,
        )
    }

    /// Make subsequent posts fail.
    pub fn reject_posts(&self) {
        self.accepting.store(false, Ordering::Relaxed);
    }
}

impl UiPort for RecordingUi {
    fn post(&self, message: &BridgeMessage) -> bool {
        self.accepting.load(Ordering::Relaxed) && self.tx.send(message.clone()).is_ok()
    }
}

/// Notifier that records every message.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification shown so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show_error(&self, message: &str) {
        self.messages.lock().push(message.to_owned());
    }
}
