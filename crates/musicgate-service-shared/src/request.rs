//! Query-parameter types and validation for the inline endpoints.

use serde::{Deserialize, Serialize};

use crate::ApiError;

/// Validation trait for request types.
///
/// Validation consumes the raw request and yields the checked value the
/// handler works with, so a handler never sees an unvalidated input.
pub trait Validate {
    /// The validated form of the request.
    type Valid;

    /// Validate the request, returning a client-input error if invalid.
    fn validate(self) -> Result<Self::Valid, ApiError>;
}

/// `GET /search/ytmusic?q=<text>`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text search query.
    pub q: Option<String>,
}

impl Validate for SearchQuery {
    type Valid = String;

    fn validate(self) -> Result<String, ApiError> {
        required(self.q, "Query 'q' is required")
    }
}

/// `GET /get/yt-stream?id=<video id>`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamQuery {
    /// Video identifier to resolve.
    pub id: Option<String>,
}

impl Validate for StreamQuery {
    type Valid = String;

    fn validate(self) -> Result<String, ApiError> {
        required(self.id, "Video ID 'id' is required")
    }
}

// Blank values count as missing.
fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ApiError::ClientInput(message.to_string())),
    }
}
