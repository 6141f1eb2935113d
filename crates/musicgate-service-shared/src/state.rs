//! Application state shared by all handlers.
//!
//! Holds the three adapters as trait objects so tests can substitute fakes
//! without touching the network.

use std::sync::Arc;

use thiserror::Error;

use musicgate_lib::{
    Error as LibError, HttpMetadataClient, MetadataUpstream, SongSearch, StreamResolver,
    YoutubeResolver, YtMusicClient, YtMusicOptions, YOUTUBE_BASE_URL, YTMUSIC_BASE_URL,
};

use crate::config::ServiceConfig;

/// Error during application state initialization.
#[derive(Debug, Error)]
pub enum AppStateError {
    #[error("failed to build search client: {0}")]
    SearchClient(#[source] LibError),

    #[error("failed to build stream resolver: {0}")]
    StreamResolver(#[source] LibError),

    #[error("failed to build metadata upstream client: {0}")]
    Upstream(#[source] LibError),
}

/// Shared application state for all axum handlers.
///
/// Cheaply cloneable (`Arc` internally); shared via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    search: Arc<dyn SongSearch>,
    resolver: Arc<dyn StreamResolver>,
    upstream: Arc<dyn MetadataUpstream>,
    docs_url: String,
}

impl AppState {
    /// Build the production adapters from configuration.
    ///
    /// No network traffic happens here: the search client initializes lazily
    /// on its first search.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, AppStateError> {
        let search = YtMusicClient::new(YtMusicOptions {
            base_url: YTMUSIC_BASE_URL.to_string(),
            language: config.ytmusic.language.clone(),
            region: config.ytmusic.region.clone(),
            timeout: config.upstream.timeout,
        })
        .map_err(AppStateError::SearchClient)?;

        let resolver = YoutubeResolver::new(YOUTUBE_BASE_URL, config.upstream.timeout)
            .map_err(AppStateError::StreamResolver)?
            .with_locale(&config.ytmusic.language, &config.ytmusic.region);

        let upstream = HttpMetadataClient::new(&config.upstream.base_url, config.upstream.timeout)
            .map_err(AppStateError::Upstream)?;

        tracing::info!(
            upstream = %upstream.base_url(),
            docs_url = %config.docs_url,
            "adapters configured"
        );

        Ok(Self::from_components(
            Arc::new(search),
            Arc::new(resolver),
            Arc::new(upstream),
            config.docs_url.clone(),
        ))
    }

    /// Create state from pre-built adapters.
    pub fn from_components(
        search: Arc<dyn SongSearch>,
        resolver: Arc<dyn StreamResolver>,
        upstream: Arc<dyn MetadataUpstream>,
        docs_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                search,
                resolver,
                upstream,
                docs_url: docs_url.into(),
            }),
        }
    }

    pub fn search(&self) -> &dyn SongSearch {
        self.inner.search.as_ref()
    }

    pub fn resolver(&self) -> &dyn StreamResolver {
        self.inner.resolver.as_ref()
    }

    pub fn upstream(&self) -> &dyn MetadataUpstream {
        self.inner.upstream.as_ref()
    }

    /// Documentation location named in 404 responses.
    pub fn docs_url(&self) -> &str {
        &self.inner.docs_url
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("docs_url", &self.inner.docs_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_builds_without_network() {
        let state = AppState::from_config(&ServiceConfig::default()).unwrap();
        assert_eq!(state.docs_url(), crate::config::DEFAULT_DOCS_URL);
    }

    #[test]
    fn from_config_rejects_bad_upstream_url() {
        let mut config = ServiceConfig::default();
        config.upstream.base_url = "not a url".to_string();

        let err = AppState::from_config(&config).unwrap_err();
        assert!(matches!(err, AppStateError::Upstream(_)));
        assert!(err.to_string().contains("metadata upstream"));
    }

    #[test]
    fn debug_output() {
        let state = AppState::from_config(&ServiceConfig::default()).unwrap();
        let debug = format!("{state:?}");
        assert!(debug.contains("AppState"));
        assert!(debug.contains("docs_url"));
    }
}
