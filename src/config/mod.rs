//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults / config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (PORT, ACCESS_TOKEN, ...)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to the request pipeline
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup and never mutated afterwards
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, CorsConfig, ListenerConfig, LogFormat, MissingTargetStatus, ObservabilityConfig,
    ProxyConfig, RoutingConfig, SecurityConfig, TimeoutConfig,
};
