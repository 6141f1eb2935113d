//! Music-metadata upstream.
//!
//! Route groups (`/song`, `/album`, ...) are served by an external metadata
//! service. The gateway forwards the original path and query verbatim and
//! hands the JSON payload back for enveloping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Metadata forwarding capability exposed to the gateway.
#[async_trait]
pub trait MetadataUpstream: Send + Sync {
    /// Fetch `path` (with optional raw `query`) from the upstream service.
    async fn fetch(&self, path: &str, query: Option<&str>) -> Result<Value>;
}

/// reqwest-backed [`MetadataUpstream`].
#[derive(Debug, Clone)]
pub struct HttpMetadataClient {
    http: Client,
    base_url: String,
}

impl HttpMetadataClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url).map_err(|_| Error::InvalidBaseUrl(base_url.clone()))?;

        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the upstream URL for a gateway path.
    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        match query.filter(|q| !q.is_empty()) {
            Some(query) => format!("{}{}?{}", self.base_url, path, query),
            None => format!("{}{}", self.base_url, path),
        }
    }
}

#[async_trait]
impl MetadataUpstream for HttpMetadataClient {
    async fn fetch(&self, path: &str, query: Option<&str>) -> Result<Value> {
        let url = self.url_for(path, query);
        debug!(url = %url, "forwarding to metadata upstream");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                message: upstream_message(&bytes, status),
            });
        }

        let body: Value = serde_json::from_slice(&bytes)?;
        Ok(unwrap_data(body))
    }
}

/// Take the `data` member out of an upstream wrapper, or return the body.
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn upstream_message(bytes: &[u8], status: StatusCode) -> String {
    serde_json::from_slice::<Value>(bytes)
        .ok()
        .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("upstream request failed")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_data_member() {
        assert_eq!(
            unwrap_data(json!({"success": true, "data": {"id": "x"}})),
            json!({"id": "x"})
        );
        assert_eq!(unwrap_data(json!([1, 2])), json!([1, 2]));
        assert_eq!(unwrap_data(json!({"id": "x"})), json!({"id": "x"}));
    }

    #[test]
    fn builds_upstream_urls() {
        let client =
            HttpMetadataClient::new("https://meta.example/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "https://meta.example/api");
        assert_eq!(
            client.url_for("/song/abc", Some("lang=en")),
            "https://meta.example/api/song/abc?lang=en"
        );
        assert_eq!(client.url_for("modules", Some("")), "https://meta.example/api/modules");
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = HttpMetadataClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidBaseUrl(_)));
    }

    #[test]
    fn message_falls_back_to_reason_phrase() {
        assert_eq!(
            upstream_message(br#"{"message":"Song not found"}"#, StatusCode::NOT_FOUND),
            "Song not found"
        );
        assert_eq!(upstream_message(b"<html>", StatusCode::BAD_GATEWAY), "Bad Gateway");
    }
}
