//! Route table.
//!
//! Every group prefix is registered three times (`/song`, `/song/` and
//! `/song/{*rest}`) so paths match with or without a trailing slash. The
//! inline endpoints are static routes and take precedence over the catch-all
//! of the group they live under.

use axum::{
    Router,
    extract::State,
    http::Uri,
    routing::get,
};

use musicgate_service_shared::{AppState, ping};

use crate::handlers::{forward_group, home, not_found, search_ytmusic, yt_stream};

/// Path prefixes delegated to the metadata upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteGroup {
    Modules,
    Song,
    Album,
    Playlist,
    Artist,
    Search,
    Show,
    Get,
    Radio,
}

impl RouteGroup {
    pub const ALL: [RouteGroup; 9] = [
        RouteGroup::Modules,
        RouteGroup::Song,
        RouteGroup::Album,
        RouteGroup::Playlist,
        RouteGroup::Artist,
        RouteGroup::Search,
        RouteGroup::Show,
        RouteGroup::Get,
        RouteGroup::Radio,
    ];

    /// Metric label and path segment.
    pub fn name(self) -> &'static str {
        match self {
            RouteGroup::Modules => "modules",
            RouteGroup::Song => "song",
            RouteGroup::Album => "album",
            RouteGroup::Playlist => "playlist",
            RouteGroup::Artist => "artist",
            RouteGroup::Search => "search",
            RouteGroup::Show => "show",
            RouteGroup::Get => "get",
            RouteGroup::Radio => "radio",
        }
    }

    pub fn prefix(self) -> String {
        format!("/{}", self.name())
    }

    /// Message of a successful forwarded response.
    pub fn success_message(self) -> &'static str {
        match self {
            RouteGroup::Modules => "✅ Modules fetched",
            RouteGroup::Song => "✅ Song details fetched",
            RouteGroup::Album => "✅ Album details fetched",
            RouteGroup::Playlist => "✅ Playlist details fetched",
            RouteGroup::Artist => "✅ Artist details fetched",
            RouteGroup::Search => "✅ Search results fetched",
            RouteGroup::Show => "✅ Show details fetched",
            RouteGroup::Get => "✅ Data fetched",
            RouteGroup::Radio => "✅ Radio station fetched",
        }
    }
}

/// Paths listed by the home route.
pub fn route_list() -> Vec<String> {
    let mut routes = vec![
        "/".to_string(),
        "/ping".to_string(),
        "/search/ytmusic?q=".to_string(),
        "/get/yt-stream?id=".to_string(),
    ];
    routes.extend(RouteGroup::ALL.iter().map(|group| group.prefix()));
    routes
}

/// Build the route table, without middleware.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(home))
        .route("/ping", get(ping))
        .route("/ping/", get(ping))
        .route("/search/ytmusic", get(search_ytmusic))
        .route("/search/ytmusic/", get(search_ytmusic))
        .route("/get/yt-stream", get(yt_stream))
        .route("/get/yt-stream/", get(yt_stream));

    for group in RouteGroup::ALL {
        let prefix = group.prefix();
        let handler = get(move |state: State<AppState>, uri: Uri| forward_group(group, state, uri));

        router = router
            .route(&prefix, handler.clone())
            .route(&format!("{prefix}/"), handler.clone())
            .route(&format!("{prefix}/{{*rest}}"), handler);
    }

    router.fallback(not_found).with_state(state)
}
