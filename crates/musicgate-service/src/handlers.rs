//! Request handlers.
//!
//! Each handler returns an [`Envelope`] on success or an [`ApiError`] that
//! renders as a failed envelope; nothing returns a bare body.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::Uri,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use musicgate_lib::{StreamCandidate, select_best_audio};
use musicgate_service_shared::{
    ApiError, AppState, Envelope, Outcome, SearchQuery, StreamQuery, Validate, from_lib_error,
    metrics::{record_search, record_stream_resolution, record_upstream_request},
    middleware::strip_pretty,
};

use crate::routes::{RouteGroup, route_list};

type ApiResult<T> = Result<Envelope<T>, ApiError>;

/// `data` of the YouTube Music search endpoint.
#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub results: Vec<Value>,
}

fn outcome_of(error: &ApiError) -> Outcome {
    if error.status().is_client_error() {
        Outcome::ClientError
    } else {
        Outcome::Failure
    }
}

// Malformed query strings are not classified: they go through the boundary.
fn query_or_unclassified<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| ApiError::unclassified(rejection.body_text()))
}

/// `GET /`
pub async fn home(State(state): State<AppState>) -> Envelope<Value> {
    Envelope::success(
        "✅ musicgate is up and running",
        json!({
            "name": "musicgate",
            "version": env!("CARGO_PKG_VERSION"),
            "docsUrl": state.docs_url(),
            "routes": route_list(),
        }),
    )
}

/// `GET /search/ytmusic?q=<text>`
pub async fn search_ytmusic(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<SearchResults> {
    let query = match query_or_unclassified(query).and_then(Validate::validate) {
        Ok(query) => query,
        Err(err) => {
            record_search(outcome_of(&err));
            return Err(err);
        }
    };

    let search = state.search();
    let results = match search.initialize().await {
        Ok(()) => search.search_songs(&query).await,
        Err(err) => Err(err),
    };

    match results {
        Ok(results) => {
            info!(query = %query, count = results.len(), "YouTube Music search completed");
            record_search(Outcome::Success);
            Ok(Envelope::success(
                "✅ YouTube Music results fetched",
                SearchResults { results },
            ))
        }
        Err(err) => {
            error!(query = %query, error = %err, "YouTube Music search failed");
            record_search(Outcome::Failure);
            Err(ApiError::Adapter(err.to_string()))
        }
    }
}

/// `GET /get/yt-stream?id=<video id>`
pub async fn yt_stream(
    State(state): State<AppState>,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> ApiResult<StreamCandidate> {
    let result = resolve_stream(&state, query).await;
    match &result {
        Ok(_) => record_stream_resolution(Outcome::Success),
        Err(err) => record_stream_resolution(outcome_of(err)),
    }
    result
}

async fn resolve_stream(
    state: &AppState,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> ApiResult<StreamCandidate> {
    let video_id = query_or_unclassified(query)?.validate()?;

    let formats = state.resolver().formats(&video_id).await.map_err(|err| {
        error!(video_id = %video_id, error = %err, "stream format lookup failed");
        from_lib_error(&err)
    })?;

    let best = select_best_audio(&formats).map_err(|err| {
        error!(video_id = %video_id, error = %err, "stream selection failed");
        from_lib_error(&err)
    })?;

    info!(video_id = %video_id, url = %best.url, bitrate = best.bitrate, "found usable stream");
    Ok(Envelope::success("✅ Stream URL fetched", best))
}

/// Any path under a delegated group prefix.
///
/// The request path and query are forwarded as-is, minus the gateway's own
/// `pretty` flag. A non-object payload is placed under `results` so `data` is
/// always an object.
pub async fn forward_group(
    group: RouteGroup,
    State(state): State<AppState>,
    uri: Uri,
) -> ApiResult<Value> {
    let path = match uri.path().trim_end_matches('/') {
        "" => "/",
        path => path,
    };

    let query = strip_pretty(uri.query());

    match state.upstream().fetch(path, query.as_deref()).await {
        Ok(payload) => {
            record_upstream_request(group.name(), Outcome::Success);
            Ok(Envelope::success(group.success_message(), as_object(payload)))
        }
        Err(err) => {
            let api_error = from_lib_error(&err);
            record_upstream_request(group.name(), outcome_of(&api_error));
            if api_error.status().is_server_error() {
                error!(group = group.name(), path, error = %err, "metadata upstream failed");
            } else {
                warn!(group = group.name(), path, error = %err, "metadata upstream rejected request");
            }
            Err(api_error)
        }
    }
}

fn as_object(payload: Value) -> Value {
    match payload {
        Value::Object(_) => payload,
        Value::Null => Value::Object(Map::new()),
        other => json!({ "results": other }),
    }
}

/// Fallback for unmatched paths.
pub async fn not_found(State(state): State<AppState>, uri: Uri) -> ApiError {
    warn!(path = %uri.path(), "no route matched");
    ApiError::RouteNotFound {
        docs_url: state.docs_url().to_string(),
    }
}
