//! Upstream target resolution.
//!
//! The upstream is whatever absolute URL the caller passes in the `target`
//! query parameter. No allow-list is applied.

use axum::http::Uri;
use url::Url;

use crate::config::MissingTargetStatus;
use crate::error::ProxyError;

/// Query parameter naming the upstream.
pub const TARGET_PARAM: &str = "target";

/// Why a request has no usable target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("target query parameter is required")]
    Missing,

    #[error("invalid target '{target}': {reason}")]
    Invalid { target: String, reason: String },
}

impl ResolveError {
    /// Map onto the pipeline error, honoring the configured missing-target status.
    pub fn into_proxy_error(self, missing: MissingTargetStatus) -> ProxyError {
        match (self, missing) {
            (ResolveError::Missing, MissingTargetStatus::ProxyError) => ProxyError::MissingTarget,
            (ResolveError::Missing, MissingTargetStatus::BadRequest) => ProxyError::TargetRequired,
            (ResolveError::Invalid { target, reason }, _) => {
                ProxyError::InvalidTarget { target, reason }
            }
        }
    }
}

/// Read the `target` query parameter as an absolute base URL.
pub fn resolve(uri: &Uri) -> Result<Url, ResolveError> {
    let raw = uri
        .query()
        .and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == TARGET_PARAM)
                .map(|(_, value)| value.into_owned())
        })
        .filter(|value| !value.is_empty())
        .ok_or(ResolveError::Missing)?;

    let target = Url::parse(&raw).map_err(|e| ResolveError::Invalid {
        target: raw.clone(),
        reason: e.to_string(),
    })?;

    if target.host_str().is_none() {
        return Err(ResolveError::Invalid {
            target: raw,
            reason: "no host".into(),
        });
    }

    Ok(target)
}

/// Join the target base with the original path and query string.
///
/// The original query, `target` included, is forwarded untouched.
pub fn upstream_uri(target: &Url, original: &Uri) -> Result<Uri, ProxyError> {
    let invalid = |reason: String| ProxyError::InvalidTarget {
        target: target.to_string(),
        reason,
    };

    let host = target.host_str().ok_or_else(|| invalid("no host".into()))?;
    let authority = match target.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let base_path = target.path().trim_end_matches('/');
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("{}://{}{}{}", target.scheme(), authority, base_path, path_and_query)
        .parse::<Uri>()
        .map_err(|e| invalid(e.to_string()))
}
