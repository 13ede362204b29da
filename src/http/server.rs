//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a single wildcard handler
//! - Wire up middleware (tracing, request ID, CORS, panic guard)
//! - Bind server to listener
//! - Run each request through auth → target → forward

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::{request_id, RequestIdLayer};
use crate::http::response::{panic_response, relay};
use crate::observability::metrics;
use crate::proxy::{extract_access_token, resolve, upstream_uri, AccessGate, Forwarder};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub gate: AccessGate,
    pub forwarder: Forwarder,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            gate: AccessGate::new(config.auth.access_token.as_str()),
            forwarder: Forwarder::new(&config.timeouts),
            config: config.clone(),
        };

        let router = Self::build_router(&config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let router = Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state);

        with_middleware(router, config.cors.enabled)
    }

    /// A clone of the fully layered router, for driving without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wrap `router` in CORS (when enabled), request IDs, tracing and the panic guard.
fn with_middleware(router: Router, cors: bool) -> Router {
    let router = if cors {
        router.layer(cors_layer())
    } else {
        router
    };

    router.layer(
        ServiceBuilder::new()
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(panic_response)),
    )
}

/// Permissive CORS: any origin, any request headers, the usual methods.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
}

/// Wildcard handler: every path and method goes through the pipeline.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Request received"
    );

    match dispatch(&state, request).await {
        Ok(response) => {
            tracing::debug!(
                request_id = %request_id,
                status = %response.status(),
                "Upstream response relayed"
            );
            metrics::record_request(method.as_str(), response.status().as_u16(), "forwarded", start_time);
            response
        }
        Err(err) => {
            if err.is_proxy_error() || matches!(err, ProxyError::Internal(_)) {
                tracing::error!(request_id = %request_id, path = %path, error = %err, "Proxy error");
            }
            metrics::record_request(method.as_str(), err.status().as_u16(), err.kind(), start_time);
            err.into_response()
        }
    }
}

/// Received → Authenticated → TargetResolved → Forwarded.
async fn dispatch(state: &AppState, request: Request<Body>) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let limit = state.config.security.max_body_size;
    let body = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| body_error(e, limit))?;

    let token = extract_access_token(&parts.headers, &body);
    state.gate.check(token.as_deref())?;

    let target = resolve(&parts.uri)
        .map_err(|e| e.into_proxy_error(state.config.routing.missing_target))?;
    let upstream = upstream_uri(&target, &parts.uri)?;

    tracing::debug!(upstream = %upstream, "Forwarding request");

    let response = state
        .forwarder
        .forward(parts.method, &parts.headers, body, upstream)
        .await?;

    Ok(relay(response))
}

/// Only an exceeded limit is a 413; a broken or aborted stream is the caller's fault.
fn body_error(err: axum::Error, limit: usize) -> ProxyError {
    let err = err.into_inner();
    if err.downcast_ref::<LengthLimitError>().is_some() {
        tracing::warn!(limit = limit, "Request body exceeded limit");
        ProxyError::BodyTooLarge { limit }
    } else {
        tracing::warn!(error = %err, "Failed to read request body");
        ProxyError::BodyRead(err.to_string())
    }
}
