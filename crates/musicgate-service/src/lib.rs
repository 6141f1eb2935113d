//! musicgate HTTP gateway.
//!
//! Routes requests to the music-metadata upstream, YouTube Music search and
//! YouTube stream resolution, and answers every request with the same JSON
//! envelope.
//!
//! # Endpoints
//!
//! - `GET /` - Welcome envelope listing the routes
//! - `GET /ping` - Liveness check
//! - `GET /search/ytmusic?q=` - YouTube Music song search
//! - `GET /get/yt-stream?id=` - Best audio stream URL for a video
//! - `GET /{modules,song,album,playlist,artist,search,show,get,radio}/...` - Forwarded upstream
//! - `GET /metrics` - Prometheus metrics (when enabled)
//!
//! # Pipeline
//!
//! Outermost first: CORS, `?pretty`, request tracking, rate limiting, key
//! casing with the envelope guard, panic boundary, then the router.

pub mod handlers;
pub mod routes;

use axum::{Router, middleware, routing::get};
use tower_http::catch_panic::CatchPanicLayer;

use musicgate_service_shared::{
    AppState, RequestTrackingLayer, ServiceConfig, build_cors_layer, metrics_handler,
    normalize_keys, panic_boundary, pretty_json,
    rate_limit::{RateLimiter, rate_limit},
};

pub use routes::{RouteGroup, router};

/// Wrap `router` in the request pipeline.
///
/// Layers run in the reverse of the order they are added: the last one sees
/// the request first.
pub fn apply_pipeline(router: Router, config: &ServiceConfig, limiter: RateLimiter) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_boundary))
        .layer(middleware::from_fn(normalize_keys))
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(RequestTrackingLayer)
        .layer(middleware::from_fn(pretty_json))
        .layer(build_cors_layer(&config.cors))
}

/// Build the complete application with an in-memory rate limit store.
pub fn build_app(state: AppState, config: &ServiceConfig) -> Router {
    build_app_with_limiter(state, config, RateLimiter::in_memory(&config.rate_limit))
}

/// Build the complete application around an existing limiter.
///
/// The metrics endpoint is mounted outside the pipeline: it serves
/// Prometheus text and is neither rate limited nor enveloped.
pub fn build_app_with_limiter(
    state: AppState,
    config: &ServiceConfig,
    limiter: RateLimiter,
) -> Router {
    let app = apply_pipeline(router(state), config, limiter);

    if config.metrics.enabled {
        app.route(&config.metrics.path, get(metrics_handler))
    } else {
        app
    }
}
