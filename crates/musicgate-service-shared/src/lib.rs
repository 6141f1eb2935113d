//! Shared HTTP infrastructure for the musicgate gateway.
//!
//! - [`Envelope`]: the uniform `{status, message, data}` response body
//! - [`ApiError`]: classified failures and the panic [`panic_boundary`]
//! - [`AppState`]: adapters shared by all handlers
//! - [`rate_limit`]: per-client fixed-window rate limiting
//! - [`middleware`]: request tracking, `?pretty`, key casing, CORS
//! - [`config`], [`logging`], [`metrics`]: process-level setup
//! - Request types with validation for the inline endpoints
//!
//! # Architecture
//!
//! Handlers stay thin; adapter logic lives in `musicgate-lib`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum Handler                                               │
//! │  - Extract and validate query parameters                    │
//! │  - Call a musicgate-lib adapter through AppState            │
//! │  - Wrap the result in an Envelope                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides fake adapters for handler testing.
//! Enable the `test-utils` feature to access it from dependent crates.

pub mod config;
mod envelope;
mod error;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod ping;
pub mod rate_limit;
mod request;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConfigError, CorsConfig, RateLimitConfig, ServiceConfig};
pub use envelope::{is_envelope, Envelope, Status};
pub use error::{from_lib_error, panic_boundary, ApiError, RATE_LIMITED_MESSAGE};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{init_metrics, metrics_handler, MetricsConfig, MetricsError, Outcome};
pub use middleware::{
    build_cors_layer, extract_or_generate_request_id, normalize_keys, pretty_json, RequestId,
    RequestTrackingLayer,
};
pub use ping::{ping, PingData};
pub use rate_limit::{
    client_identity, InMemoryRateLimitStore, RateLimitDecision, RateLimitStore, RateLimiter,
};
pub use request::{SearchQuery, StreamQuery, Validate};
pub use state::{AppState, AppStateError};
