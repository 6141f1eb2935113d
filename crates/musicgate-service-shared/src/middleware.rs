//! HTTP middleware for the gateway pipeline.
//!
//! This module provides:
//! - [`RequestTrackingLayer`]: request id, request span, completion log and HTTP metrics
//! - [`pretty_json`]: re-indents JSON bodies when `?pretty` is present
//! - [`normalize_keys`]: camelCases JSON bodies and wraps bare error bodies in an envelope
//! - [`build_cors_layer`]: CORS policy from [`CorsConfig`]
//!
//! # Request ID Propagation
//!
//! The tracking layer takes `X-Request-ID` from the request if present,
//! otherwise generates a UUID v7. The id is recorded on the request span and
//! echoed back in the response's `X-Request-ID` header.
//!
//! # Metrics Recording
//!
//! - `http_requests_total`: Counter by method, path, status bucket
//! - `http_request_duration_seconds`: Histogram by method, path
//! - `http_request_size_bytes`: Histogram by method, path
//! - `http_response_size_bytes`: Histogram by method, path

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        response::Parts,
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use pin_project_lite::pin_project;
use serde_json::Value;
use tower::{Layer, Service};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info_span, Span};
use uuid::Uuid;

use musicgate_lib::casing::camel_case_keys;

use crate::config::CorsConfig;
use crate::envelope::{is_envelope, Envelope};
use crate::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Newtype wrapper for request correlation IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new UUID v7 (time-sortable) request ID.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Extract the `X-Request-ID` header, or generate a UUID v7 when it is
/// missing, empty or not valid UTF-8.
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(RequestId::from)
        .unwrap_or_else(RequestId::generate)
}

/// Strip the query string from a path used as a metric label.
pub fn normalize_path(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

/// Group status codes into "2xx" .. "5xx" metric labels.
pub fn status_bucket(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

fn content_length(headers: &HeaderMap) -> Option<f64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
}

// =============================================================================
// RequestTrackingLayer
// =============================================================================

/// Tower layer for request logging and HTTP metrics.
#[derive(Debug, Clone, Default)]
pub struct RequestTrackingLayer;

impl<S> Layer<S> for RequestTrackingLayer {
    type Service = RequestTracking<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTracking { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestTracking<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<axum::http::Request<ReqBody>> for RequestTracking<S>
where
    S: Service<axum::http::Request<ReqBody>, Response = axum::http::Response<ResBody>>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
    ReqBody: http_body::Body + Send + 'static,
    ResBody: http_body::Body + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = RequestTrackingFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: axum::http::Request<ReqBody>) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = normalize_path(req.uri().path()).to_string();

        if let Some(size) = content_length(req.headers()) {
            metrics::histogram!(
                "http_request_size_bytes",
                "method" => method.clone(),
                "path" => path.clone()
            )
            .record(size);
        }

        let request_id = extract_or_generate_request_id(req.headers());
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.to_string());

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %path,
            remote_addr = remote_addr.as_deref().unwrap_or("-"),
        );

        {
            let _enter = span.enter();
            tracing::info!("handling request");
        }

        RequestTrackingFuture {
            inner: self.inner.call(req),
            start,
            method,
            path,
            request_id,
            span,
        }
    }
}

pin_project! {
    /// Records completion metrics and the response log line.
    pub struct RequestTrackingFuture<F> {
        #[pin]
        inner: F,
        start: Instant,
        method: String,
        path: String,
        request_id: RequestId,
        span: Span,
    }
}

impl<F, ResBody, E> Future for RequestTrackingFuture<F>
where
    F: Future<Output = Result<axum::http::Response<ResBody>, E>>,
    ResBody: http_body::Body,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _enter = this.span.enter();

        let mut result = ready!(this.inner.poll(cx));
        let duration_secs = this.start.elapsed().as_secs_f64();
        let latency_ms = duration_secs * 1000.0;

        let status_label = match &mut result {
            Ok(response) => {
                let status = response.status().as_u16();

                if let Ok(value) = HeaderValue::from_str(this.request_id.as_str()) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }

                if let Some(size) = content_length(response.headers()) {
                    metrics::histogram!(
                        "http_response_size_bytes",
                        "method" => this.method.clone(),
                        "path" => this.path.clone()
                    )
                    .record(size);
                }

                tracing::info!(status, latency_ms, "request completed");
                status_bucket(status)
            }
            Err(_) => {
                tracing::error!(latency_ms, "request failed");
                "5xx"
            }
        };

        metrics::counter!(
            "http_requests_total",
            "method" => this.method.clone(),
            "path" => this.path.clone(),
            "status" => status_label
        )
        .increment(1);

        metrics::histogram!(
            "http_request_duration_seconds",
            "method" => this.method.clone(),
            "path" => this.path.clone()
        )
        .record(duration_secs);

        Poll::Ready(result)
    }
}

// =============================================================================
// Body rewriting middleware
// =============================================================================

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// Whether the query string carries a `pretty` flag (`?pretty`, `?pretty=1`, ...).
pub fn wants_pretty(query: Option<&str>) -> bool {
    query.is_some_and(|q| q.split('&').any(is_pretty_flag))
}

fn is_pretty_flag(pair: &str) -> bool {
    pair == "pretty" || pair.starts_with("pretty=")
}

/// The query string without the gateway's `pretty` flag, or `None` when
/// nothing else is left.
pub fn strip_pretty(query: Option<&str>) -> Option<String> {
    let kept: Vec<&str> = query?
        .split('&')
        .filter(|pair| !pair.is_empty() && !is_pretty_flag(pair))
        .collect();

    (!kept.is_empty()).then(|| kept.join("&"))
}

async fn buffer(response: Response) -> Result<(Parts, axum::body::Bytes), Response> {
    let (parts, body) = response.into_parts();
    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => Ok((parts, bytes)),
        Err(err) => {
            tracing::error!(error = %err, "failed to buffer response body");
            Err(ApiError::Adapter("Failed to read response body".to_string()).into_response())
        }
    }
}

fn rebuild(mut parts: Parts, bytes: Vec<u8>) -> Response {
    parts.headers.remove(CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(bytes))
}

/// Re-serialize JSON responses with two-space indentation when the request
/// asked for `?pretty`.
pub async fn pretty_json(request: Request, next: Next) -> Response {
    let pretty = wants_pretty(request.uri().query());
    let response = next.run(request).await;

    if !pretty || !is_json(response.headers()) {
        return response;
    }

    let (parts, bytes) = match buffer(response).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };

    let body = serde_json::from_slice::<Value>(&bytes)
        .and_then(|value| serde_json::to_vec_pretty(&value))
        .unwrap_or_else(|_| bytes.to_vec());

    rebuild(parts, body)
}

/// Rewrite outgoing JSON object keys to camelCase.
///
/// Also acts as the envelope guard: an error response whose body is empty,
/// not JSON, or not envelope-shaped (e.g. the router's bare 405) is replaced
/// by a failed envelope carrying the status' canonical reason. Headers such
/// as `Allow` and `Retry-After` are kept.
pub async fn normalize_keys(request: Request, next: Next) -> Response {
    let is_head = request.method() == Method::HEAD;
    let response = next.run(request).await;
    let status = response.status();
    let failed = status.is_client_error() || status.is_server_error();

    if is_head || (!failed && !is_json(response.headers())) {
        return response;
    }

    let (parts, bytes) = match buffer(response).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };

    let parsed = serde_json::from_slice::<Value>(&bytes)
        .ok()
        .map(camel_case_keys);

    let value = match parsed {
        Some(value) if !failed || is_envelope(&value) => value,
        _ => envelope_for(status),
    };

    match serde_json::to_vec(&value) {
        Ok(body) => rebuild(parts, body),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize response body");
            ApiError::Adapter("Failed to serialize response body".to_string()).into_response()
        }
    }
}

fn envelope_for(status: StatusCode) -> Value {
    let message = status.canonical_reason().unwrap_or("Request failed");
    serde_json::to_value(Envelope::<Value>::failed(message)).unwrap_or(Value::Null)
}

// =============================================================================
// CORS
// =============================================================================

/// Permissive when no origins are configured (or `*` is listed), otherwise
/// an exact-match allowlist.
pub fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers(Any);

    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    tracing::info!(allowed_origins = ?config.allowed_origins, "CORS configured with origin allowlist");
    cors.allow_origin(AllowOrigin::list(origins))
}
