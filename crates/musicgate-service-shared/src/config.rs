//! Service configuration.
//!
//! Everything is read from environment variables. Unparseable values fall
//! back to their defaults; [`ServiceConfig::validate`] rejects combinations
//! the service cannot run with.
//!
//! | variable | default |
//! |---|---|
//! | `SERVICE_HOST` | `0.0.0.0` |
//! | `SERVICE_PORT` | `3001` |
//! | `DOCS_URL` | `https://saavn.dev/docs` |
//! | `UPSTREAM_BASE_URL` | `https://saavn.dev/api` |
//! | `UPSTREAM_TIMEOUT_SECS` | `10` |
//! | `RATE_LIMIT_ENABLED` | `true` |
//! | `RATE_LIMIT_REQUESTS` | `100` |
//! | `RATE_LIMIT_WINDOW_SECS` | `60` |
//! | `CORS_ALLOWED_ORIGINS` | unset (any origin) |
//! | `YTMUSIC_LANGUAGE` / `YTMUSIC_REGION` | `en` / `US` |
//! | `METRICS_ENABLED` / `METRICS_PATH` | `true` / `/metrics` |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::MetricsConfig;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DOCS_URL: &str = "https://saavn.dev/docs";
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://saavn.dev/api";

/// Invalid configuration detected at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("RATE_LIMIT_REQUESTS must be at least 1")]
    ZeroRateLimit,

    #[error("RATE_LIMIT_WINDOW_SECS must be at least 1")]
    ZeroRateWindow,

    #[error("UPSTREAM_BASE_URL must start with http:// or https:// (got '{0}')")]
    InvalidUpstreamUrl(String),

    #[error("METRICS_PATH must start with '/' (got '{0}')")]
    InvalidMetricsPath(String),
}

/// Rate limiting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed per client per window.
    pub requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

/// CORS settings. No origins means any origin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// Metadata upstream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// YouTube Music locale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YtMusicConfig {
    pub language: String,
    pub region: String,
}

impl Default for YtMusicConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            region: "US".to_string(),
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Documentation location named in 404 responses.
    pub docs_url: String,
    pub upstream: UpstreamConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub ytmusic: YtMusicConfig,
    pub metrics: MetricsConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            docs_url: DEFAULT_DOCS_URL.to_string(),
            upstream: UpstreamConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            ytmusic: YtMusicConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let lookup = &lookup;
        let string = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: parsed(lookup, "SERVICE_HOST").unwrap_or(defaults.host),
            port: parsed(lookup, "SERVICE_PORT").unwrap_or(defaults.port),
            docs_url: string("DOCS_URL").unwrap_or(defaults.docs_url),
            upstream: UpstreamConfig {
                base_url: string("UPSTREAM_BASE_URL").unwrap_or(defaults.upstream.base_url),
                timeout: parsed(lookup, "UPSTREAM_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.upstream.timeout),
            },
            rate_limit: RateLimitConfig {
                enabled: lookup("RATE_LIMIT_ENABLED")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(defaults.rate_limit.enabled),
                requests: parsed(lookup, "RATE_LIMIT_REQUESTS").unwrap_or(defaults.rate_limit.requests),
                window: parsed(lookup, "RATE_LIMIT_WINDOW_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.rate_limit.window),
            },
            cors: CorsConfig {
                allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .map(|v| split_list(&v))
                    .unwrap_or_default(),
            },
            ytmusic: YtMusicConfig {
                language: string("YTMUSIC_LANGUAGE").unwrap_or(defaults.ytmusic.language),
                region: string("YTMUSIC_REGION").unwrap_or(defaults.ytmusic.region),
            },
            metrics: MetricsConfig {
                enabled: lookup("METRICS_ENABLED")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(defaults.metrics.enabled),
                path: string("METRICS_PATH").unwrap_or(defaults.metrics.path),
            },
        }
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.enabled {
            if self.rate_limit.requests == 0 {
                return Err(ConfigError::ZeroRateLimit);
            }
            if self.rate_limit.window.is_zero() {
                return Err(ConfigError::ZeroRateWindow);
            }
        }

        let base = &self.upstream.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidUpstreamUrl(base.clone()));
        }

        if !self.metrics.path.starts_with('/') {
            return Err(ConfigError::InvalidMetricsPath(self.metrics.path.clone()));
        }

        Ok(())
    }

    /// Address to bind.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

// Anything other than an explicit "off" value enables the flag.
fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
