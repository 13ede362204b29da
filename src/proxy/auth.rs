//! Shared-secret gate.
//!
//! The caller proves itself by putting `accessToken` in the request body.
//! JSON and urlencoded form bodies are understood; anything else counts as
//! a missing token.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProxyError;
use crate::observability::metrics;

/// Body schema the gate looks for. Other fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct AccessTokenBody {
    #[serde(rename = "accessToken", default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyEncoding {
    Json,
    Form,
    Other,
}

fn body_encoding(headers: &HeaderMap) -> BodyEncoding {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return BodyEncoding::Json;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        BodyEncoding::Json
    } else if mime == "application/x-www-form-urlencoded" {
        BodyEncoding::Form
    } else {
        BodyEncoding::Other
    }
}

/// Decode a JSON body into [`AccessTokenBody`].
///
/// Only a top-level object qualifies; a repeated key keeps its last value.
fn parse_json_body(body: &[u8]) -> Option<AccessTokenBody> {
    match serde_json::from_slice::<Value>(body).ok()? {
        object @ Value::Object(_) => serde_json::from_value(object).ok(),
        _ => None,
    }
}

/// Pull a non-empty `accessToken` out of the buffered request body.
pub fn extract_access_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    let token = match body_encoding(headers) {
        BodyEncoding::Json => parse_json_body(body).and_then(|parsed| parsed.access_token),
        BodyEncoding::Form => url::form_urlencoded::parse(body)
            .filter(|(key, _)| key == "accessToken")
            .last()
            .map(|(_, value)| value.into_owned()),
        BodyEncoding::Other => None,
    };

    token.filter(|t| !t.is_empty())
}

/// Compares presented tokens against the configured secret.
#[derive(Clone)]
pub struct AccessGate {
    secret: Arc<str>,
}

impl AccessGate {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Admit the request or say why not.
    pub fn check(&self, presented: Option<&str>) -> Result<(), ProxyError> {
        let Some(token) = presented.filter(|t| !t.is_empty()) else {
            tracing::warn!("Rejected request without access token");
            metrics::record_rejection("missing_token");
            return Err(ProxyError::MissingToken);
        };

        if !constant_time_eq(token.as_bytes(), self.secret.as_bytes()) {
            tracing::warn!("Rejected request with invalid access token");
            metrics::record_rejection("invalid_token");
            return Err(ProxyError::InvalidToken);
        }

        Ok(())
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}

/// Equality whose running time depends only on the lengths involved.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
