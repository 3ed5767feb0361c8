//! The bridge between one debuggee session and one debugger panel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use futures::StreamExt;
use sedap_core::BridgeId;
use sedap_core::logging::DEBUGGEE_TARGET;
use sedap_protocol::session::{
    self, Command, CommandResult, CustomEvent, IdArgs, LogEvent, StartProcArgs,
    StepSpecificArgs, UnificationResult,
};
use sedap_protocol::{BridgeMessage, DebuggerState, UiMessage};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::BridgeError;
use crate::ports::{Notifier, SessionEvent, SessionHandle, UiInbound, UiPort};
use crate::registry::SessionRegistry;

/// Lifecycle of a [`Bridge`]. `Disposed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeState {
    /// Registered and receiving.
    Active,
    /// Subscriptions released and registry entry removed.
    Disposed,
}

/// Translates between the panel vocabulary and the session request/event
/// surface for one (session, panel) pair.
pub struct Bridge {
    id: BridgeId,
    session: SessionHandle,
    ui: Arc<dyn UiPort>,
    notifier: Arc<dyn Notifier>,
    log_enabled: bool,
    registry: Weak<SessionRegistry>,
    disposed: AtomicBool,
    /// Cancels every subscription the bridge holds.
    subscriptions: CancellationToken,
}

impl Bridge {
    /// Pair `session` with a panel and register the result.
    ///
    /// Subscribes to `inbound`; the end of that stream disposes the bridge.
    /// Session events are not subscribed here: they arrive through
    /// [`SessionRegistry::dispatch`]. Must be called within a Tokio runtime.
    pub fn attach(
        registry: &Arc<SessionRegistry>,
        session: SessionHandle,
        ui: Arc<dyn UiPort>,
        inbound: UiInbound,
        notifier: Arc<dyn Notifier>,
        log_enabled: bool,
    ) -> Arc<Self> {
        let bridge = Arc::new(Self {
            id: registry.allocate_id(),
            session,
            ui,
            notifier,
            log_enabled,
            registry: Arc::downgrade(registry),
            disposed: AtomicBool::new(false),
            subscriptions: CancellationToken::new(),
        });
        registry.insert(Arc::clone(&bridge));
        info!(bridge_id = bridge.id.get(), log_enabled, "bridge attached");

        drop(tokio::spawn(Arc::clone(&bridge).run_inbound(inbound)));
        bridge
    }

    /// Registry key.
    pub fn id(&self) -> BridgeId {
        self.id
    }

    /// The session this bridge is bound to.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Whether debuggee `log` events are printed.
    pub fn log_enabled(&self) -> bool {
        self.log_enabled
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        if self.disposed.load(Ordering::Acquire) {
            BridgeState::Disposed
        } else {
            BridgeState::Active
        }
    }

    /// Resolves once the bridge is disposed.
    pub async fn closed(&self) {
        self.subscriptions.cancelled().await;
    }

    /// Release subscriptions and the registry entry.
    ///
    /// Idempotent: only the first call has any effect, and only that call
    /// returns `true`.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.subscriptions.cancel();
        if let Some(registry) = self.registry.upgrade() {
            let _ = registry.remove(self.id);
        }
        info!(bridge_id = self.id.get(), "bridge disposed");
        true
    }

    /// Tell the panel to discard view-local state.
    pub fn reset_view(&self) {
        self.post(BridgeMessage::ResetView);
    }

    /// Handle one custom event from the bound session. Never fails.
    pub fn handle_session_event(&self, event: &SessionEvent) {
        if self.state() == BridgeState::Disposed {
            return;
        }
        if event.event == session::LOG_EVENT && !self.log_enabled {
            return;
        }
        match CustomEvent::decode(&event.event, event.body.clone()) {
            Ok(CustomEvent::Log(log)) => self.print_log(&log),
            Ok(CustomEvent::DebugStateUpdate(state)) => {
                self.post(BridgeMessage::StateUpdate { state });
            }
            Ok(CustomEvent::Unhandled(name)) => {
                error!(bridge_id = self.id.get(), "unhandled custom event '{name}'");
            }
            Err(e) => {
                warn!(bridge_id = self.id.get(), error = %e, "dropping malformed custom event");
            }
        }
    }

    /// Handle one panel request through to its response.
    ///
    /// Session failures are returned, never sent to the panel. A request
    /// still in flight when the bridge is disposed runs to completion, but
    /// what it would have posted is dropped.
    pub async fn handle_ui_message(&self, message: UiMessage) -> Result<(), BridgeError> {
        if self.state() == BridgeState::Disposed {
            debug!(bridge_id = self.id.get(), kind = message.kind(), "bridge disposed, ignoring request");
            return Ok(());
        }
        match message {
            UiMessage::RequestStateUpdate => {
                if let Some(state) = self.debugger_state().await? {
                    self.post(BridgeMessage::StateUpdate { state });
                }
            }
            UiMessage::RequestJump { cmd_id } => {
                self.run_command(Command::Jump, &IdArgs { id: cmd_id }).await?;
            }
            UiMessage::RequestExecSpecific {
                prev_id,
                branch_case,
            } => {
                let args = StepSpecificArgs {
                    prev_id,
                    branch_case,
                };
                self.run_command(Command::StepSpecific, &args).await?;
            }
            UiMessage::RequestUnification { id } => {
                if let Some(result) = self.unification(id).await? {
                    self.post(BridgeMessage::UnifyUpdate {
                        unify_id: result.unify_id,
                        unify_map: result.unify_map,
                    });
                }
            }
            UiMessage::RequestStartProc { proc_name } => {
                self.run_command(Command::StartProc, &StartProcArgs { proc_name })
                    .await?;
            }
        }
        Ok(())
    }

    #[instrument(skip_all, fields(bridge_id = self.id.get()))]
    async fn run_inbound(self: Arc<Self>, mut inbound: UiInbound) {
        let cancelled = self.subscriptions.clone();
        loop {
            tokio::select! {
                () = cancelled.cancelled() => break,
                next = inbound.next() => match next {
                    Some(message) => self.spawn_ui_handler(message),
                    None => {
                        debug!("panel closed");
                        let _ = self.dispose();
                        break;
                    }
                },
            }
        }
    }

    /// Handlers run independently; none waits for another.
    fn spawn_ui_handler(self: &Arc<Self>, message: UiMessage) {
        let bridge = Arc::clone(self);
        drop(tokio::spawn(async move {
            let kind = message.kind();
            if let Err(e) = bridge.handle_ui_message(message).await {
                warn!(bridge_id = bridge.id.get(), kind, error = %e, "panel request failed");
            }
        }));
    }

    async fn debugger_state(&self) -> Result<Option<DebuggerState>, BridgeError> {
        let raw = self
            .session
            .send_request(session::DEBUGGER_STATE, Value::Null)
            .await?;
        if raw.is_null() {
            return Ok(None);
        }
        Ok(Some(DebuggerState(raw)))
    }

    async fn unification(&self, id: i64) -> Result<Option<UnificationResult>, BridgeError> {
        let raw = self
            .request(session::UNIFICATION, &IdArgs { id })
            .await?;
        Ok(session::decode_result(session::UNIFICATION, raw)?)
    }

    async fn run_command<A: Serialize>(&self, command: Command, args: &A) -> Result<(), BridgeError> {
        let request = command.request_name();
        let raw = self.request(request, args).await?;
        let result: CommandResult = session::decode_result(request, raw)?
            .ok_or(BridgeError::MissingResult { request })?;
        if let Some(message) = result.failure_message(command.fallback_error()) {
            self.notifier.show_error(&message);
        }
        Ok(())
    }

    async fn request<A: Serialize>(&self, request: &'static str, args: &A) -> Result<Value, BridgeError> {
        let arguments = serde_json::to_value(args)
            .map_err(|source| BridgeError::Encode { request, source })?;
        debug!(bridge_id = self.id.get(), request, "issuing session request");
        Ok(self.session.send_request(request, arguments).await?)
    }

    fn print_log(&self, log: &LogEvent) {
        match log.payload() {
            Some(json) => {
                info!(target: DEBUGGEE_TARGET, bridge_id = self.id.get(), json = %json, "<D> {}", log.msg);
            }
            None => info!(target: DEBUGGEE_TARGET, bridge_id = self.id.get(), "<D> {}", log.msg),
        }
    }

    fn post(&self, message: BridgeMessage) {
        if self.state() == BridgeState::Disposed {
            debug!(bridge_id = self.id.get(), kind = message.kind(), "bridge disposed, dropping message");
            return;
        }
        if !self.ui.post(&message) {
            warn!(bridge_id = self.id.get(), kind = message.kind(), "panel did not accept message");
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("id", &self.id)
            .field("session", &self.session)
            .field("log_enabled", &self.log_enabled)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
