//! API error taxonomy and the global error boundary.
//!
//! Handlers classify failures as precisely as they can and return an
//! [`ApiError`]; each variant knows its HTTP status and renders as a failed
//! [`Envelope`]. Anything that escapes classification (panics, extractor
//! rejections) lands in [`ApiError::Unclassified`] via the error boundary.

use std::any::Any;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use musicgate_lib::Error as LibError;

use crate::envelope::Envelope;

/// Message returned with every 429 response.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later";

/// Errors a handler or middleware can surface to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Missing or invalid request input.
    #[error("{0}")]
    ClientInput(String),

    /// A third-party adapter failed or produced nothing usable.
    #[error("{0}")]
    Adapter(String),

    /// The caller exceeded its request budget.
    #[error("Too many requests, please try again later")]
    RateLimited { retry_after_secs: u64 },

    /// No route matched the request path.
    #[error("Requested route not found, please check the documentation at {docs_url}")]
    RouteNotFound { docs_url: String },

    /// The upstream reported that the requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A failure nobody classified; rendered by the error boundary.
    #[error("❌ {0}")]
    Unclassified(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ClientInput(_) | ApiError::Unclassified(_) => StatusCode::BAD_REQUEST,
            ApiError::Adapter(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::RouteNotFound { .. } | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Wrap a failure nobody classified, logging it at the error boundary.
    pub fn unclassified(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(boundary = "error boundary", error = %message, "unhandled failure reached the error boundary");
        ApiError::Unclassified(message)
    }

    /// The failed envelope this error renders as.
    pub fn envelope(&self) -> Envelope {
        Envelope::failed(self.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = self.envelope().into_response_with(status);

        if let ApiError::RateLimited { retry_after_secs } = self {
            response.headers_mut().insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs),
            );
        }

        response
    }
}

/// Classify a library error.
pub fn from_lib_error(error: &LibError) -> ApiError {
    match error {
        LibError::UpstreamStatus { status: 404, message } => ApiError::NotFound(message.clone()),
        LibError::InvalidVideoId(_) => ApiError::ClientInput(error.to_string()),
        err if err.is_client_error() => ApiError::ClientInput(err.to_string()),
        _ => ApiError::Adapter(error.to_string()),
    }
}

impl From<LibError> for ApiError {
    fn from(error: LibError) -> Self {
        from_lib_error(&error)
    }
}

/// Global error boundary for panics.
///
/// Installed with `tower_http::catch_panic::CatchPanicLayer::custom`; turns
/// the panic payload into a 400 envelope. The status is fixed: the boundary
/// cannot know what kind of failure it caught.
pub fn panic_boundary(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown failure".to_string()
    };

    ApiError::unclassified(message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::ClientInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Adapter("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::RateLimited { retry_after_secs: 1 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::RouteNotFound { docs_url: "d".into() }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Unclassified("x".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn messages() {
        let not_found = ApiError::RouteNotFound {
            docs_url: "https://docs.example".to_string(),
        };
        assert_eq!(
            not_found.to_string(),
            "Requested route not found, please check the documentation at https://docs.example"
        );
        assert_eq!(ApiError::Unclassified("boom".into()).to_string(), "❌ boom");
        assert_eq!(
            ApiError::RateLimited { retry_after_secs: 3 }.to_string(),
            RATE_LIMITED_MESSAGE
        );
    }

    #[test]
    fn envelope_has_null_data() {
        let envelope = ApiError::ClientInput("Query 'q' is required".into()).envelope();
        assert!(!envelope.is_success());
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message, "Query 'q' is required");
    }

    #[test]
    fn rate_limited_response_has_retry_after() {
        let response = ApiError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[axum::http::header::RETRY_AFTER], "42");
    }

    #[test]
    fn lib_error_classification() {
        assert_eq!(
            from_lib_error(&LibError::NoAudioFormats),
            ApiError::Adapter("No usable audio formats found for this video.".into())
        );
        assert_eq!(
            from_lib_error(&LibError::UpstreamStatus {
                status: 404,
                message: "Song not found".into()
            }),
            ApiError::NotFound("Song not found".into())
        );
        assert_eq!(
            from_lib_error(&LibError::UpstreamStatus {
                status: 400,
                message: "bad id".into()
            }),
            ApiError::ClientInput("bad id".into())
        );
        assert!(matches!(
            from_lib_error(&LibError::InvalidVideoId("x".into())),
            ApiError::ClientInput(_)
        ));
        assert!(matches!(
            from_lib_error(&LibError::UpstreamStatus {
                status: 503,
                message: "down".into()
            }),
            ApiError::Adapter(_)
        ));
    }

    #[test]
    fn unclassified_failures_are_logged_at_the_boundary() {
        let (logs, _guard) = crate::test_utils::LogCapture::install();

        let error = ApiError::unclassified("duplicate field `q`");

        assert_eq!(error, ApiError::Unclassified("duplicate field `q`".into()));
        let output = logs.contents();
        assert!(output.contains("error boundary"), "{output}");
        assert!(output.contains("duplicate field `q`"), "{output}");
    }

    #[test]
    fn panic_boundary_renders_envelope() {
        let response = panic_boundary(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = panic_boundary(Box::new(String::from("owned kaboom")));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = panic_boundary(Box::new(7_u8));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
