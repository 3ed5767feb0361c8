//! `SedapServer`: Axum HTTP + WebSocket host.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use parking_lot::RwLock;
use sedap_bridge::{Notifier, SessionHandle, SessionRegistry};
use sedap_core::ConnectionId;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::run_panel_session;

/// The debug session new panels are paired with.
#[derive(Default)]
pub struct ActiveSession {
    slot: RwLock<Option<SessionHandle>>,
}

impl ActiveSession {
    /// Current session, if any.
    pub fn get(&self) -> Option<SessionHandle> {
        self.slot.read().clone()
    }

    /// Install `session`, replacing any previous one.
    pub fn set(&self, session: SessionHandle) {
        *self.slot.write() = Some(session);
    }

    /// Clear the slot if it still holds `session`. Returns whether it did.
    pub fn clear_if(&self, session: &SessionHandle) -> bool {
        let mut slot = self.slot.write();
        if slot.as_ref().is_some_and(|s| s.is_same(session)) {
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Whether a session is installed.
    pub fn is_active(&self) -> bool {
        self.slot.read().is_some()
    }
}

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live bridges.
    pub registry: Arc<SessionRegistry>,
    /// Session for new panels.
    pub session: Arc<ActiveSession>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// User-visible notifications.
    pub notifier: Arc<dyn Notifier>,
    /// When the server started.
    pub start_time: Instant,
}

/// The panel host.
pub struct SedapServer {
    config: Arc<ServerConfig>,
    registry: Arc<SessionRegistry>,
    session: Arc<ActiveSession>,
    notifier: Arc<dyn Notifier>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl SedapServer {
    /// Create a server with an empty registry and no session.
    pub fn new(config: ServerConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(SessionRegistry::new()),
            session: Arc::new(ActiveSession::default()),
            notifier,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
            session: self.session.clone(),
            config: self.config.clone(),
            notifier: self.notifier.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind and serve until the shutdown token is cancelled.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                warn!(error = %e, "server stopped with error");
            }
        });
        info!(%addr, "listening");
        Ok((addr, handle))
    }

    /// Live bridges.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The session slot.
    pub fn session(&self) -> &Arc<ActiveSession> {
        &self.session
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.registry.len(),
        state.session.is_active(),
    ))
}

/// GET /ws: pair a new panel with the active session.
async fn ws_handler(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(session) = state.session.get() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "no active debug session").into_response();
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    let max_message_size = state.config.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| {
            run_panel_session(socket, ConnectionId::new(), session, state)
        })
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::TracingNotifier;
    use axum::body::Body;
    use axum::http::Request;
    use sedap_bridge::testing::FakeSession;
    use tower::ServiceExt;

    fn make_server() -> SedapServer {
        SedapServer::new(ServerConfig::default(), Arc::new(TracingNotifier))
    }

    fn session() -> SessionHandle {
        SessionHandle::new(Arc::new(FakeSession::new()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[test]
    fn active_session_clear_is_identity_checked() {
        let slot = ActiveSession::default();
        let a = session();
        let b = session();
        slot.set(a.clone());

        assert!(!slot.clear_if(&b));
        assert!(slot.is_active());
        assert!(slot.clear_if(&a));
        assert!(!slot.is_active());
        assert!(!slot.clear_if(&a));
    }

    #[tokio::test]
    async fn health_reports_counters() {
        let server = make_server();
        let (status, body) = get_json(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["bridges"], 0);
        assert_eq!(body["sessionActive"], false);

        server.session().set(session());
        let (_, body) = get_json(server.router(), "/health").await;
        assert_eq!(body["sessionActive"], true);
    }

    #[tokio::test]
    async fn ws_without_session_is_unavailable() {
        let server = make_server();
        let resp = server
            .router()
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ws_without_upgrade_headers_is_rejected() {
        let server = make_server();
        server.session().set(session());
        let resp = server
            .router()
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let (status, _) = get_json(server.router(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_and_stops_on_shutdown() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
