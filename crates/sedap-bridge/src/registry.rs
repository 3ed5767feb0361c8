//! Process-wide table of live bridges.
//!
//! Routing follows session identity: an event from session S reaches exactly
//! the bridges bound to S. The table lock is never held while a bridge runs,
//! since bridges remove themselves on dispose.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use sedap_core::BridgeId;
use tracing::{debug, info};

use crate::bridge::Bridge;
use crate::ports::{SessionEvent, SessionHandle};

/// Bridge-id to bridge mapping.
#[derive(Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    bridges: RwLock<BTreeMap<BridgeId, Arc<Bridge>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate_id(&self) -> BridgeId {
        BridgeId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn insert(&self, bridge: Arc<Bridge>) {
        let _ = self.bridges.write().insert(bridge.id(), bridge);
    }

    pub(crate) fn remove(&self, id: BridgeId) -> Option<Arc<Bridge>> {
        self.bridges.write().remove(&id)
    }

    /// Look up a bridge by id.
    pub fn get(&self, id: BridgeId) -> Option<Arc<Bridge>> {
        self.bridges.read().get(&id).cloned()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: BridgeId) -> bool {
        self.bridges.read().contains_key(&id)
    }

    /// Number of live bridges.
    pub fn len(&self) -> usize {
        self.bridges.read().len()
    }

    /// Whether no bridge is live.
    pub fn is_empty(&self) -> bool {
        self.bridges.read().is_empty()
    }

    /// Every bridge bound to the identical session, in id order.
    pub fn bridges_for(&self, session: &SessionHandle) -> Vec<Arc<Bridge>> {
        self.bridges
            .read()
            .values()
            .filter(|b| b.session().is_same(session))
            .cloned()
            .collect()
    }

    /// Deliver a custom event to every bridge bound to its session.
    ///
    /// Returns the number of bridges that received it.
    pub fn dispatch(&self, event: &SessionEvent) -> usize {
        let targets = self.bridges_for(&event.session);
        if targets.is_empty() {
            debug!(event = %event.event, "no bridge for session, dropping event");
        }
        for bridge in &targets {
            bridge.handle_session_event(event);
        }
        targets.len()
    }

    /// Dispose every bridge bound to a terminated session.
    ///
    /// Returns the number of bridges this call disposed.
    pub fn terminate(&self, session: &SessionHandle) -> usize {
        let disposed = self
            .bridges_for(session)
            .iter()
            .filter(|b| b.dispose())
            .count();
        info!(disposed, "session terminated");
        disposed
    }

    /// Dispose every bridge. Used at shutdown.
    pub fn dispose_all(&self) -> usize {
        let all: Vec<_> = self.bridges.read().values().cloned().collect();
        all.iter().filter(|b| b.dispose()).count()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("bridges", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeState;
    use crate::testing::{FakeSession, RecordingNotifier, RecordingUi};
    use futures::StreamExt;
    use sedap_protocol::{BridgeMessage, DebuggerState};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn attach(
        registry: &Arc<SessionRegistry>,
        session: &SessionHandle,
    ) -> (Arc<Bridge>, mpsc::UnboundedReceiver<BridgeMessage>) {
        let (ui, rx) = RecordingUi::new();
        let bridge = Bridge::attach(
            registry,
            session.clone(),
            Arc::new(ui),
            futures::stream::pending().boxed(),
            Arc::new(RecordingNotifier::new()),
            false,
        );
        (bridge, rx)
    }

    fn state_event(session: &SessionHandle, n: i64) -> SessionEvent {
        SessionEvent {
            session: session.clone(),
            event: "debugStateUpdate".into(),
            body: json!({"n": n}),
        }
    }

    #[tokio::test]
    async fn ids_are_unique_and_increasing() {
        let registry = Arc::new(SessionRegistry::new());
        let session = SessionHandle::new(Arc::new(FakeSession::new()));
        let (a, _ra) = attach(&registry, &session);
        let (b, _rb) = attach(&registry, &session);
        assert!(a.id() < b.id());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(a.id()).unwrap().id(), a.id());
    }

    #[tokio::test]
    async fn dispatch_reaches_only_identical_session() {
        let registry = Arc::new(SessionRegistry::new());
        let s1 = SessionHandle::new(Arc::new(FakeSession::new()));
        let s2 = SessionHandle::new(Arc::new(FakeSession::new()));
        let (_b1, mut r1) = attach(&registry, &s1);
        let (_b2, mut r2) = attach(&registry, &s2);

        assert_eq!(registry.dispatch(&state_event(&s1, 1)), 1);

        assert_eq!(
            r1.try_recv().unwrap(),
            BridgeMessage::StateUpdate {
                state: DebuggerState(json!({"n": 1}))
            }
        );
        assert!(r2.try_recv().is_err());
    }

    #[tokio::test]
    async fn dispatch_fans_out_to_every_bridge_of_session() {
        let registry = Arc::new(SessionRegistry::new());
        let session = SessionHandle::new(Arc::new(FakeSession::new()));
        let (_a, mut ra) = attach(&registry, &session);
        let (_b, mut rb) = attach(&registry, &session);

        assert_eq!(registry.dispatch(&state_event(&session, 2)), 2);
        assert!(ra.try_recv().is_ok());
        assert!(rb.try_recv().is_ok());
    }

    #[tokio::test]
    async fn dispatch_without_bridges_is_a_no_op() {
        let registry = SessionRegistry::new();
        let session = SessionHandle::new(Arc::new(FakeSession::new()));
        assert_eq!(registry.dispatch(&state_event(&session, 0)), 0);
    }

    #[tokio::test]
    async fn terminate_disposes_matching_bridges_only() {
        let registry = Arc::new(SessionRegistry::new());
        let s1 = SessionHandle::new(Arc::new(FakeSession::new()));
        let s2 = SessionHandle::new(Arc::new(FakeSession::new()));
        let (b1, _r1) = attach(&registry, &s1);
        let (b2, _r2) = attach(&registry, &s2);

        assert_eq!(registry.terminate(&s1), 1);

        assert_eq!(b1.state(), BridgeState::Disposed);
        assert_eq!(b2.state(), BridgeState::Active);
        assert!(!registry.contains(b1.id()));
        assert!(registry.contains(b2.id()));
    }

    #[tokio::test]
    async fn terminate_after_dispose_counts_nothing() {
        let registry = Arc::new(SessionRegistry::new());
        let session = SessionHandle::new(Arc::new(FakeSession::new()));
        let (bridge, _r) = attach(&registry, &session);

        assert!(bridge.dispose());
        assert_eq!(registry.terminate(&session), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn dispose_all_empties_registry() {
        let registry = Arc::new(SessionRegistry::new());
        let s1 = SessionHandle::new(Arc::new(FakeSession::new()));
        let s2 = SessionHandle::new(Arc::new(FakeSession::new()));
        let _ = attach(&registry, &s1);
        let _ = attach(&registry, &s2);

        assert_eq!(registry.dispose_all(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.dispose_all(), 0);
    }
}
