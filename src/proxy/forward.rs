//! Upstream forwarding.
//!
//! One shared client serves every request. Each call gets its own deadline;
//! there are no retries.

use std::sync::OnceLock;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, Uri},
};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::error::ProxyError;
use crate::proxy::headers::upstream_headers;

/// Client type used for upstream calls (http and https).
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Sends requests to the resolved upstream.
#[derive(Clone)]
pub struct Forwarder {
    client: UpstreamClient,
    upstream_timeout: Duration,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        install_crypto_provider();

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(https);

        Self {
            client,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
        }
    }

    /// Replay method, headers and body against `upstream` and wait for its response.
    pub async fn forward(
        &self,
        method: Method,
        headers: &HeaderMap,
        body: Bytes,
        upstream: Uri,
    ) -> Result<hyper::Response<Incoming>, ProxyError> {
        let uri_str = upstream.to_string();
        let outbound_headers = upstream_headers(headers, &upstream);

        let mut request = Request::builder()
            .method(method)
            .uri(upstream)
            .body(Body::from(body))
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        *request.headers_mut() = outbound_headers;

        match tokio::time::timeout(self.upstream_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ProxyError::UpstreamUnreachable {
                uri: uri_str,
                reason: error_chain(&e),
            }),
            Err(_) => Err(ProxyError::UpstreamTimeout {
                uri: uri_str,
                after: self.upstream_timeout,
            }),
        }
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("upstream_timeout", &self.upstream_timeout)
            .finish_non_exhaustive()
    }
}

/// Install ring as the process-wide rustls provider once.
fn install_crypto_provider() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        // Err means another provider is already installed, which is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Flatten an error and its sources into one line for logs.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
