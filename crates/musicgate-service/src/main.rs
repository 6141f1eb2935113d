//! musicgate HTTP gateway binary.
//!
//! # Configuration
//!
//! - `SERVICE_HOST` / `SERVICE_PORT` - Bind address (default: 0.0.0.0:3001)
//! - `UPSTREAM_BASE_URL` - Music-metadata service (default: https://saavn.dev/api)
//! - `RATE_LIMIT_*`, `CORS_ALLOWED_ORIGINS`, `METRICS_*` - see `ServiceConfig`
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text

use std::net::SocketAddr;

use tracing::{error, info, warn};

use musicgate_service::build_app;
use musicgate_service_shared::{
    AppState, LoggingConfig, ServiceConfig, init_logging, init_metrics,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_config = LoggingConfig::from_env().with_service("musicgate");
    init_logging(&logging_config);

    let config = ServiceConfig::from_env();
    config.validate().map_err(|e| {
        error!(error = %e, "invalid configuration");
        e
    })?;

    if config.metrics.enabled {
        if let Err(e) = init_metrics(&config.metrics) {
            warn!(error = %e, "failed to initialize metrics, continuing without metrics");
        }
    }

    let state = AppState::from_config(&config).map_err(|e| {
        error!(error = %e, "failed to build application state");
        e
    })?;

    info!(
        upstream = %config.upstream.base_url,
        rate_limit_enabled = config.rate_limit.enabled,
        rate_limit_requests = config.rate_limit.requests,
        rate_limit_window_secs = config.rate_limit.window.as_secs(),
        "starting musicgate"
    );

    let app = build_app(state, &config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "listening on");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
