//! Liveness handler.
//!
//! `GET /ping` answers locally without touching any adapter, so it can serve
//! as a probe while the upstream services are down.

use axum::response::IntoResponse;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// Payload of the ping envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PingData {
    pub service: String,
    pub version: String,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

impl PingData {
    pub fn now(service: &str, version: &str) -> Self {
        Self {
            service: service.to_string(),
            version: version.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// ```text
/// GET /ping
/// {"status":"Success","message":"pong","data":{"service":"musicgate","version":"0.1.0","timestamp":"..."}}
/// ```
pub async fn ping() -> impl IntoResponse {
    Envelope::success("pong", PingData::now("musicgate", env!("CARGO_PKG_VERSION")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn ping_data_now() {
        let data = PingData::now("musicgate", "1.0.0");
        assert_eq!(data.service, "musicgate");
        assert_eq!(data.version, "1.0.0");
        assert!(chrono::DateTime::parse_from_rfc3339(&data.timestamp).is_ok());
    }

    #[tokio::test]
    async fn ping_responds_success() {
        let response = ping().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
