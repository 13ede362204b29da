//! Request dispatch pipeline.
//!
//! # Data Flow
//! ```text
//! Buffered request (method, uri, headers, body)
//!     → auth.rs (accessToken in body vs. shared secret)
//!     → target.rs (target query parameter → upstream URI)
//!     → headers.rs (hop-by-hop removal, Host rewrite)
//!     → forward.rs (upstream call with deadline)
//!     → upstream response, or a ProxyError
//!
//! Per-request states:
//!     Received → Authenticated → TargetResolved → Forwarded → Responded
//!     any stage → Failed(ProxyError) → Responded(error)
//! ```
//!
//! # Design Decisions
//! - No state is shared between requests except read-only config
//! - Each stage returns a Result; nothing is retried

pub mod auth;
pub mod forward;
pub mod headers;
pub mod target;

pub use auth::{extract_access_token, AccessGate};
pub use forward::Forwarder;
pub use target::{resolve, upstream_uri, ResolveError};
