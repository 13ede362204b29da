//! Request pipeline errors.
//!
//! Every failure a request can hit maps to exactly one status code and a
//! fixed `{"error": ...}` message. Transport failures and a missing target
//! collapse into the same 500 so callers cannot tell them apart.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::response::json_error;

pub const MSG_MISSING_TOKEN: &str = "Access token is required";
pub const MSG_INVALID_TOKEN: &str = "Unauthorized access";
pub const MSG_PROXY_ERROR: &str = "Proxy error occurred";
pub const MSG_TARGET_REQUIRED: &str = "Target query parameter is required";
pub const MSG_BODY_TOO_LARGE: &str = "Request body too large";
pub const MSG_INVALID_BODY: &str = "Invalid request body";
pub const MSG_INTERNAL: &str = "Internal server error";

/// Terminal outcome of a request that was not forwarded.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No non-empty `accessToken` in the request body.
    #[error("access token missing from request body")]
    MissingToken,

    /// `accessToken` present but not equal to the shared secret.
    #[error("access token rejected")]
    InvalidToken,

    /// No `target` query parameter; reported as a proxy error.
    #[error("target query parameter is required")]
    MissingTarget,

    /// No `target` query parameter; reported as a client error.
    #[error("target query parameter is required")]
    TargetRequired,

    /// `target` could not be turned into an upstream URI.
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Connecting to or talking with the upstream failed.
    #[error("upstream {uri} unreachable: {reason}")]
    UpstreamUnreachable { uri: String, reason: String },

    /// The upstream did not answer within the deadline.
    #[error("upstream {uri} timed out after {after:?}")]
    UpstreamTimeout { uri: String, after: Duration },

    /// The request body could not be buffered within the size limit.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The request body stream failed before it was fully read.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// Anything not classified above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status written to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingToken | ProxyError::TargetRequired | ProxyError::BodyRead(_) => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::InvalidToken => StatusCode::FORBIDDEN,
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::MissingTarget
            | ProxyError::InvalidTarget { .. }
            | ProxyError::UpstreamUnreachable { .. }
            | ProxyError::UpstreamTimeout { .. }
            | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the JSON body. Never leaks upstream details.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::MissingToken => MSG_MISSING_TOKEN,
            ProxyError::InvalidToken => MSG_INVALID_TOKEN,
            ProxyError::TargetRequired => MSG_TARGET_REQUIRED,
            ProxyError::BodyTooLarge { .. } => MSG_BODY_TOO_LARGE,
            ProxyError::BodyRead(_) => MSG_INVALID_BODY,
            ProxyError::MissingTarget
            | ProxyError::InvalidTarget { .. }
            | ProxyError::UpstreamUnreachable { .. }
            | ProxyError::UpstreamTimeout { .. } => MSG_PROXY_ERROR,
            ProxyError::Internal(_) => MSG_INTERNAL,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingToken => "missing_token",
            ProxyError::InvalidToken => "invalid_token",
            ProxyError::MissingTarget | ProxyError::TargetRequired => "missing_target",
            ProxyError::InvalidTarget { .. } => "invalid_target",
            ProxyError::UpstreamUnreachable { .. } => "upstream_unreachable",
            ProxyError::UpstreamTimeout { .. } => "upstream_timeout",
            ProxyError::BodyTooLarge { .. } => "body_too_large",
            ProxyError::BodyRead(_) => "invalid_body",
            ProxyError::Internal(_) => "internal",
        }
    }

    /// True for failures that happened while trying to reach the upstream.
    pub fn is_proxy_error(&self) -> bool {
        self.public_message() == MSG_PROXY_ERROR
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProxyError::MissingToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ProxyError::InvalidToken.status(), StatusCode::FORBIDDEN);
        assert_eq!(ProxyError::MissingTarget.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ProxyError::TargetRequired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProxyError::UpstreamTimeout { uri: "http://x".into(), after: Duration::from_secs(1) }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ProxyError::BodyTooLarge { limit: 1 }.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ProxyError::BodyRead("reset".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ProxyError::BodyRead("reset".into()).public_message(), "Invalid request body");
    }

    #[test]
    fn test_transport_failures_share_message() {
        let errors = [
            ProxyError::MissingTarget,
            ProxyError::InvalidTarget { target: "x".into(), reason: "y".into() },
            ProxyError::UpstreamUnreachable { uri: "http://x".into(), reason: "refused".into() },
            ProxyError::UpstreamTimeout { uri: "http://x".into(), after: Duration::from_secs(1) },
        ];
        for err in errors {
            assert!(err.is_proxy_error(), "{err}");
            assert_eq!(err.public_message(), "Proxy error occurred");
        }
        assert!(!ProxyError::Internal("boom".into()).is_proxy_error());
        assert!(!ProxyError::BodyRead("reset".into()).is_proxy_error());
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = ProxyError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"Unauthorized access"}"#);
    }
}
