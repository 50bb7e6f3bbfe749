//! WebSocket front door for the kitchen.
//!
//! This module defines [`KitchenService`], the session factory. Every upgrade
//! request on `/` becomes a new [`Session`] with a fresh ledger and a fresh
//! fryer pool; the service itself only holds configuration, a session id
//! counter and the server-wide shutdown token.
//!
//! ## Responsibilities
//!
//! - Accept WebSocket upgrades and hand each socket to its own session.
//! - Derive each session's shutdown token from the server-wide one.
//! - Log and record metrics for every session summary.
//! - Drain all live sessions on shutdown.

use crate::server::{
    config::ServerConfig,
    session::{
        Session, SessionSummary,
        transport::{Frame, split_socket},
    },
    telemetry::{
        decrement_sessions_inflight, increment_session_errors, increment_sessions,
        increment_sessions_inflight,
    },
};
use axum::{
    Router,
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use core::{fmt, time::Duration};
use futures::{Sink, Stream};
use portable_atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Creates one isolated kitchen per connection.
#[derive(Clone)]
pub struct KitchenService {
    config: Arc<ServerConfig>,
    next_session: Arc<AtomicU64>,
    sessions_inflight: Arc<AtomicUsize>,
    shutdown_token: CancellationToken,
}

impl KitchenService {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            next_session: Arc::new(AtomicU64::new(0)),
            sessions_inflight: Arc::new(AtomicUsize::new(0)),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// The HTTP surface: `GET /` upgrades to a kitchen session.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(upgrade))
            .with_state(self.clone())
    }

    /// Builds the next session. Its shutdown token is a child of the
    /// service's, so [`KitchenService::shutdown`] reaches it.
    pub fn open_session(&self) -> Session {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        Session::new(id, &self.config, self.shutdown_token.child_token())
    }

    /// Counts a connection as in flight, or refuses it once shutdown has
    /// begun. The count is raised before the shutdown check so that
    /// [`KitchenService::shutdown`] either sees the connection or the
    /// connection sees the shutdown.
    fn admit(&self) -> Option<InflightGuard> {
        let inflight = InflightGuard::enter(self.sessions_inflight.clone());
        if self.is_shutting_down() {
            return None;
        }
        Some(inflight)
    }

    /// Runs a session over an upgraded socket until it closes.
    async fn serve_connection(self, socket: WebSocket, inflight: InflightGuard) {
        let (inbound, outbound) = split_socket(socket);
        self.run_admitted(inflight, inbound, outbound).await;
    }

    /// Runs a session over any frame stream and text sink.
    pub async fn run_session<R, E, W>(&self, inbound: R, outbound: W) -> SessionSummary
    where
        R: Stream<Item = Result<Frame, E>> + Unpin + Send,
        E: fmt::Display + Send,
        W: Sink<String> + Unpin + Send + 'static,
        W::Error: fmt::Display + Send,
    {
        let inflight = InflightGuard::enter(self.sessions_inflight.clone());
        self.run_admitted(inflight, inbound, outbound).await
    }

    async fn run_admitted<R, E, W>(
        &self,
        _inflight: InflightGuard,
        inbound: R,
        outbound: W,
    ) -> SessionSummary
    where
        R: Stream<Item = Result<Frame, E>> + Unpin + Send,
        E: fmt::Display + Send,
        W: Sink<String> + Unpin + Send + 'static,
        W::Error: fmt::Display + Send,
    {
        let session = self.open_session();
        let span = tracing::info_span!("session", id = session.id());

        increment_sessions();

        let summary = async move {
            tracing::info!("Session opened");
            session.run(inbound, outbound).await
        }
        .instrument(span.clone())
        .await;

        span.in_scope(|| record_summary(&summary));
        summary
    }

    /// Sessions currently running.
    pub fn sessions_inflight(&self) -> usize {
        self.sessions_inflight.load(Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Refuses new sessions, cancels every live one and waits until they
    /// have all closed.
    pub async fn shutdown(&self) {
        tracing::info!("Refusing new sessions");
        self.shutdown_token.cancel();

        tracing::info!(
            "Draining in-flight sessions ({} active)",
            self.sessions_inflight()
        );
        while self.sessions_inflight() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        tracing::info!("Kitchen shutdown complete");
    }
}

async fn upgrade(State(service): State<KitchenService>, ws: WebSocketUpgrade) -> Response {
    let Some(inflight) = service.admit() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    ws.on_failed_upgrade(|e| tracing::warn!("WebSocket upgrade failed: {e}"))
        .on_upgrade(move |socket| service.serve_connection(socket, inflight))
}

fn record_summary(summary: &SessionSummary) {
    if summary.close_reason.is_error() {
        increment_session_errors();
        tracing::warn!(
            ingredients = summary.ingredients_received,
            portions = summary.portions_dispatched,
            "Session closed: {} (stock left: {:?})",
            summary.close_reason,
            summary.stock
        );
    } else {
        tracing::info!(
            ingredients = summary.ingredients_received,
            portions = summary.portions_dispatched,
            "Session closed: {} (stock left: {:?})",
            summary.close_reason,
            summary.stock
        );
    }
}

/// Counts a connection as live for as long as it is held, from admission
/// until its session has closed.
struct InflightGuard {
    count: Arc<AtomicUsize>,
}

impl InflightGuard {
    fn enter(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        increment_sessions_inflight();
        Self { count }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
        decrement_sessions_inflight();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::session::{CloseReason, SessionState};
    use futures::{StreamExt, channel::mpsc};

    fn service() -> KitchenService {
        KitchenService::new(ServerConfig {
            fry_duration: Duration::from_millis(10),
            ..ServerConfig::default()
        })
    }

    #[test]
    fn sessions_get_increasing_ids() {
        let service = service();
        let first = service.open_session();
        let second = service.open_session();

        assert_eq!(first.id(), 0);
        assert_eq!(second.id(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_admitted_connections() {
        let service = service();
        let inflight = service.admit().expect("admitted before shutdown");
        assert_eq!(service.sessions_inflight(), 1);

        let draining = {
            let service = service.clone();
            tokio::spawn(async move { service.shutdown().await })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!draining.is_finished());
        assert!(service.admit().is_none());
        assert_eq!(service.sessions_inflight(), 1);

        drop(inflight);
        draining.await.unwrap();
        assert_eq!(service.sessions_inflight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_live_sessions() {
        let service = service();
        let (in_tx, in_rx) = mpsc::unbounded::<Result<Frame, String>>();
        let (out_tx, mut out_rx) = mpsc::unbounded::<String>();

        let running = {
            let service = service.clone();
            tokio::spawn(async move { service.run_session(in_rx, out_tx).await })
        };

        in_tx
            .unbounded_send(Ok(Frame::Text(String::from(
                r#"{"ingredient":"eggs","count":2}"#,
            ))))
            .unwrap();
        assert!(out_rx.next().await.is_some());
        assert_eq!(service.sessions_inflight(), 1);

        service.shutdown().await;

        assert_eq!(service.sessions_inflight(), 0);
        assert!(service.is_shutting_down());
        let summary = running.await.unwrap();
        assert!(matches!(summary.close_reason, CloseReason::Shutdown));
        assert_eq!(summary.state, SessionState::Closed);
        assert_eq!(summary.stock.eggs, 2);
    }
}
