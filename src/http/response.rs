//! Response handling.
//!
//! # Responsibilities
//! - Relay upstream responses to the caller unchanged
//! - Build the JSON error bodies produced by the proxy itself
//! - Turn handler panics into a well-formed 500
//!
//! # Design Decisions
//! - Upstream bodies are streamed, never buffered
//! - Upstream status and headers pass through as-is

use std::any::Any;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;

use crate::error::MSG_INTERNAL;

/// `{"error": message}` with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "error": message }).to_string();
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

/// Hand an upstream response back to the caller with its body streaming.
pub fn relay(upstream: hyper::Response<Incoming>) -> Response {
    let (parts, body) = upstream.into_parts();
    Response::from_parts(parts, Body::new(body))
}

/// Response used by the catch-panic layer.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "Request handler panicked");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_error() {
        let response = json_error(StatusCode::BAD_REQUEST, "Access token is required");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"Access token is required"}"#);
    }

    #[tokio::test]
    async fn test_panic_response() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"Internal server error"}"#);
    }
}
