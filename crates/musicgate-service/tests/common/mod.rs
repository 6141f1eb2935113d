//! Shared helpers for the gateway integration tests.

#![allow(dead_code)]

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use serde_json::Value;

use musicgate_service::build_app;
use musicgate_service_shared::{
    AppState, ServiceConfig, is_envelope,
    test_utils::{TEST_DOCS_URL, test_state},
};

/// Configuration used by the tests: metrics off, generous rate limit.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.docs_url = TEST_DOCS_URL.to_string();
    config.metrics.enabled = false;
    config
}

/// Configuration with a tight rate limit.
pub fn limited_config(requests: u32, window: Duration) -> ServiceConfig {
    let mut config = test_config();
    config.rate_limit.requests = requests;
    config.rate_limit.window = window;
    config
}

pub fn server() -> TestServer {
    server_with(test_state(), &test_config())
}

pub fn server_with(state: AppState, config: &ServiceConfig) -> TestServer {
    TestServer::new(build_app(state, config)).expect("failed to start test server")
}

/// `X-Forwarded-For` header naming `ip` as the client.
pub fn client(ip: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_static(ip),
    )
}

/// Assert the body is an envelope and return it.
pub fn envelope(body: Value) -> Value {
    assert!(is_envelope(&body), "not an envelope: {body}");
    body
}
