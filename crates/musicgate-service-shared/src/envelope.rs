//! The uniform response envelope.
//!
//! Every body the gateway produces, success or failure, has the shape
//! `{status, message, data}`. Failures always carry `data: null`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome marker of an [`Envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Failed,
}

/// Response wrapper used by every endpoint and error path.
///
/// # Example
///
/// ```
/// use musicgate_service_shared::{Envelope, Status};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct StreamUrl {
///     url: String,
/// }
///
/// let envelope = Envelope::success("✅ Stream URL fetched", StreamUrl { url: "https://a".into() });
/// assert_eq!(envelope.status, Status::Success);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub status: Status,

    /// Human-readable outcome.
    pub message: String,

    /// Payload; serialized as `null` when absent.
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Create a successful envelope around `data`.
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create a failed envelope. `data` is always `null`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

impl<T: Serialize> Envelope<T> {
    /// Render with an explicit HTTP status.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Successful envelopes render as 200; failures built directly (rather than
/// through [`crate::ApiError`]) render as 500.
impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = if self.is_success() {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        self.into_response_with(status)
    }
}

/// Check that `value` has the envelope shape.
///
/// Used by the envelope guard and by tests asserting the response contract.
pub fn is_envelope(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    let status_ok = matches!(
        map.get("status").and_then(Value::as_str),
        Some("Success") | Some("Failed")
    );
    let message_ok = map.get("message").is_some_and(Value::is_string);
    let data_ok = map
        .get("data")
        .is_some_and(|data| data.is_null() || data.is_object());
    status_ok && message_ok && data_ok
}
