//! HTTP front server.
//!
//! # Responsibilities
//! - Build the Axum router: asset fallback, timeouts, tracing, request ID
//! - Classify each connection's first request (upgrade or HTTP)
//! - Hand upgrades to the tunnel router, serve the rest with hyper HTTP/1.1
//! - Stop accepting on shutdown and drain in-flight HTTP connections
//! - Observability (metrics, correlation IDs)

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http,
    middleware::{self, Next},
    response::Response,
    Router,
};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tower::ServiceExt;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::assets::{serve_asset, AssetState};
use crate::config::ServerConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::net::{
    read_request_head, ClassifyError, ConnectionGuard, ConnectionPermit, ConnectionTracker, Listener,
    ListenerError, RequestGate, MAX_HEAD_SIZE,
};
use crate::observability::metrics;
use crate::security::{enforce_policy, HeaderPolicy, InvalidOrigin};
use crate::tunnel::{TunnelBackend, UpgradeRouter};

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid header policy: {0}")]
    Policy(#[from] InvalidOrigin),
}

/// How draining ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every tracked connection finished.
    Drained,
    /// The grace period elapsed with connections still open.
    GraceElapsed { remaining: u64 },
    /// A second shutdown request cut draining short.
    Forced { remaining: u64 },
}

/// The front server: one listening socket, assets over HTTP, upgrades to the tunnel.
pub struct FrontServer {
    app: Router,
    upgrades: UpgradeRouter,
    tracker: ConnectionTracker,
    header_read_timeout: Duration,
    drain: watch::Sender<bool>,
}

/// Per-connection view of the server, cheap to clone into a task.
#[derive(Clone)]
struct ConnectionContext {
    app: Router,
    upgrades: UpgradeRouter,
    header_read_timeout: Duration,
    drain: watch::Receiver<bool>,
}

impl FrontServer {
    pub fn new(config: &ServerConfig, backend: Arc<dyn TunnelBackend>) -> Result<Self, ServerError> {
        let policy = Arc::new(HeaderPolicy::from_origins(config.policy.allowed_embed_origins.as_slice())?);
        let assets = AssetState::from_config(&config.mounts);
        let app = Self::build_router(config, assets, policy);

        let (drain, _) = watch::channel(false);
        Ok(Self {
            app,
            upgrades: UpgradeRouter::new(config.tunnel.path.clone(), backend),
            tracker: ConnectionTracker::new(),
            header_read_timeout: Duration::from_secs(config.timeouts.header_read_secs),
            drain,
        })
    }

    /// Build the Axum router: asset fallback plus the middleware stack.
    fn build_router(config: &ServerConfig, assets: AssetState, policy: Arc<HeaderPolicy>) -> Router {
        with_middleware(Router::new().fallback(serve_asset).with_state(assets), config, policy)
    }

    /// The HTTP service, without the connection handling around it.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    pub fn tunnel_path(&self) -> &str {
        self.upgrades.endpoint()
    }

    /// Accept connections until `shutdown` completes.
    ///
    /// The listener is dropped on return, so new connects are refused, and
    /// every HTTP connection is told to finish its current response.
    pub async fn serve<F>(&self, listener: Listener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer, permit)) => {
                        let guard = self.tracker.track();
                        tokio::spawn(handle_connection(self.context(), socket, peer, guard, permit));
                    }
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        self.drain.send_replace(true);
        tracing::info!(
            active_connections = self.tracker.active_count(),
            "Stopped accepting connections"
        );
    }

    /// Wait for tracked connections to finish, at most `grace`, or until `force`.
    pub async fn drain<F>(&self, grace: Duration, force: F) -> DrainOutcome
    where
        F: Future<Output = ()>,
    {
        self.drain.send_replace(true);

        tokio::select! {
            biased;
            _ = self.tracker.wait_idle() => DrainOutcome::Drained,
            _ = force => DrainOutcome::Forced { remaining: self.tracker.active_count() },
            _ = tokio::time::sleep(grace) => DrainOutcome::GraceElapsed {
                remaining: self.tracker.active_count(),
            },
        }
    }

    fn context(&self) -> ConnectionContext {
        ConnectionContext {
            app: self.app.clone(),
            upgrades: self.upgrades.clone(),
            header_read_timeout: self.header_read_timeout,
            drain: self.drain.subscribe(),
        }
    }
}

/// Drive one accepted connection to completion.
async fn handle_connection(
    ctx: ConnectionContext,
    mut socket: TcpStream,
    peer: SocketAddr,
    guard: ConnectionGuard,
    permit: ConnectionPermit,
) {
    let conn_id = guard.id();

    let head = tokio::time::timeout(ctx.header_read_timeout, read_request_head(&mut socket, MAX_HEAD_SIZE))
        .await
        .unwrap_or(Err(ClassifyError::Timeout));

    let head = match head {
        Ok(Some(head)) => head,
        Ok(None) => {
            tracing::trace!(conn_id = %conn_id, peer = %peer, "Connection closed before a request");
            return;
        }
        Err(e) => {
            tracing::debug!(conn_id = %conn_id, peer = %peer, error = %e, "Request classification failed");
            return;
        }
    };

    if head.is_upgrade() {
        // Tunnels are not ours to drain or count against the limit.
        drop(guard);
        drop(permit);
        ctx.upgrades.route(socket, peer, head);
        return;
    }

    // Later heads are vetted by the gate, so hyper only ever parses heads
    // the classifier accepted and never writes an error response of its own.
    let (_, buffered, _) = head.into_parts();
    let io = TokioIo::new(RequestGate::new(socket, buffered, MAX_HEAD_SIZE, ctx.header_read_timeout));

    let app = ctx.app;
    let service = hyper::service::service_fn(move |mut request: http::Request<hyper::body::Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        app.clone().oneshot(request)
    });

    // No timer: hyper's own header timeout would answer with a bare 408.
    // Half-close keeps an in-flight response alive when the gate ends the stream.
    let conn = http1::Builder::new()
        .half_close(true)
        .keep_alive(true)
        .serve_connection(io, service);
    tokio::pin!(conn);

    let mut drain = ctx.drain;
    let result = tokio::select! {
        biased;
        result = conn.as_mut() => result,
        _ = async { let _ = drain.wait_for(|draining| *draining).await; } => {
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };

    if let Err(e) = result {
        tracing::debug!(conn_id = %conn_id, peer = %peer, error = %e, "HTTP connection ended with error");
    }

    drop(permit);
    drop(guard);
}

/// Wrap `app` in timeouts, metrics, tracing, request IDs and the header policy.
///
/// The header policy is added last so it wraps everything else,
/// including timeout responses and the fallback.
fn with_middleware(app: Router, config: &ServerConfig, policy: Arc<HeaderPolicy>) -> Router {
    app.layer(TimeoutLayer::with_status_code(
        http::StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeouts.request_secs),
    ))
    .layer(middleware::from_fn(record_metrics))
    .layer(TraceLayer::new_for_http().make_span_with(|request: &http::Request<Body>| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = request_id(request).unwrap_or("-"),
        )
    }))
    .layer(propagate_request_id_layer())
    .layer(set_request_id_layer())
    .layer(middleware::map_response_with_state(policy, enforce_policy))
}

/// Count and time every HTTP response.
async fn record_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
