//! Axum router, shared state and the listening server.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use conclave_governance::{GovernanceEngine, GovernanceError};
use conclave_store::GovernanceStore;
use tracing::info;

use crate::auth::origin_gate;
use crate::error::RpcError;
use crate::handlers;
use crate::metrics::GovernanceMetrics;

/// State shared by every handler.
pub struct AppState<S> {
    pub engine: GovernanceEngine<S>,
    /// `None` when metrics are disabled; `/metrics` then answers 404.
    pub metrics: Option<GovernanceMetrics>,
    /// Peers allowed to report the client address in `X-Forwarded-For`.
    pub trusted_proxies: Vec<IpAddr>,
}

impl<S> AppState<S> {
    pub fn new(engine: GovernanceEngine<S>, metrics: Option<GovernanceMetrics>) -> Self {
        Self {
            engine,
            metrics,
            trusted_proxies: Vec::new(),
        }
    }

    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = proxies;
        self
    }

    pub fn record(&self, f: impl FnOnce(&GovernanceMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}

/// Run an engine operation on the blocking pool. Store transactions are
/// synchronous and may wait on the single writer lock.
pub(crate) async fn blocking<S, T, F>(state: &Arc<AppState<S>>, f: F) -> Result<T, RpcError>
where
    S: GovernanceStore + 'static,
    T: Send + 'static,
    F: FnOnce(&GovernanceEngine<S>) -> Result<T, GovernanceError> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state.engine))
        .await
        .map_err(|e| RpcError::Server(format!("engine task failed: {e}")))?
        .map_err(RpcError::from)
}

pub fn build_router<S: GovernanceStore + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/votes", get(handlers::list_votes::<S>))
        .route("/votes/:id", get(handlers::vote_detail::<S>))
        .route("/votes/:id/ballots", post(handlers::cast_ballot::<S>))
        .route("/nominations", post(handlers::nominate::<S>))
        .route(
            "/nominations/candidates",
            get(handlers::nomination_candidates::<S>),
        )
        .route("/promotions", post(handlers::initiate_promotion::<S>))
        .route("/scheduler/inquisitor", post(handlers::select_inquisitor::<S>))
        .route("/scheduler/votes/:id/close", post(handlers::close_vote::<S>))
        .route("/scheduler/votes/close-due", post(handlers::close_due_votes::<S>))
        .route("/scheduler/retirements", post(handlers::retire::<S>))
        .route("/blacklist/:origin", get(handlers::blacklist_lookup::<S>))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics::<S>))
        .layer(middleware::from_fn_with_state(state.clone(), origin_gate::<S>))
        .with_state(state)
}

pub struct RpcServer<S> {
    pub bind_address: String,
    pub port: u16,
    pub state: Arc<AppState<S>>,
}

impl<S: GovernanceStore + 'static> RpcServer<S> {
    pub fn new(bind_address: impl Into<String>, port: u16, state: Arc<AppState<S>>) -> Self {
        Self {
            bind_address: bind_address.into(),
            port,
            state,
        }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.bind_address, self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {addr}: {e}")))?;
        info!(%addr, "RPC server listening");

        let app = build_router(self.state);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| RpcError::Server(format!("RPC server terminated: {e}")))?;
        info!("RPC server stopped");
        Ok(())
    }
}
