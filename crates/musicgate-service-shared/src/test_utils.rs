//! Fake adapters and fixtures for handler testing.
//!
//! Enable the `test-utils` feature to use these from dependent crates.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use musicgate_lib::{Error, MetadataUpstream, Result, SongSearch, StreamFormat, StreamResolver};

use crate::state::AppState;

pub const TEST_DOCS_URL: &str = "https://docs.example/musicgate";

/// Search fake returning a fixed result list and counting calls.
#[derive(Debug, Default)]
pub struct FakeSearch {
    results: Vec<Value>,
    failure: Option<String>,
    initializations: AtomicUsize,
    searches: AtomicUsize,
}

impl FakeSearch {
    pub fn with_results(results: Vec<Value>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    /// Every search fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SongSearch for FakeSearch {
    async fn initialize(&self) -> Result<()> {
        // Only the first call counts, like a real one-shot initialization.
        let _ = self
            .initializations
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst);
        Ok(())
    }

    async fn search_songs(&self, _query: &str) -> Result<Vec<Value>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(Error::UnexpectedResponse {
                service: "ytmusic",
                message: message.clone(),
            }),
            None => Ok(self.results.clone()),
        }
    }
}

/// Resolver fake returning fixed formats.
#[derive(Debug, Default)]
pub struct FakeResolver {
    formats: Vec<StreamFormat>,
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn with_formats(formats: Vec<StreamFormat>) -> Self {
        Self {
            formats,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn formats(&self, _video_id: &str) -> Result<Vec<StreamFormat>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.formats.clone())
    }
}

/// Upstream fake answering every path with the same response.
#[derive(Debug)]
pub struct FakeUpstream {
    response: std::result::Result<Value, (u16, String)>,
    last_request: parking_lot::Mutex<Option<(String, Option<String>)>>,
}

impl FakeUpstream {
    pub fn returning(value: Value) -> Self {
        Self {
            response: Ok(value),
            last_request: parking_lot::Mutex::new(None),
        }
    }

    /// Answer every request with an upstream error status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            response: Err((status, message.into())),
            last_request: parking_lot::Mutex::new(None),
        }
    }

    /// Path and query of the most recent request.
    pub fn last_request(&self) -> Option<(String, Option<String>)> {
        self.last_request.lock().clone()
    }
}

impl Default for FakeUpstream {
    fn default() -> Self {
        Self::returning(json!({}))
    }
}

#[async_trait]
impl MetadataUpstream for FakeUpstream {
    async fn fetch(&self, path: &str, query: Option<&str>) -> Result<Value> {
        *self.last_request.lock() = Some((path.to_string(), query.map(String::from)));
        match &self.response {
            Ok(value) => Ok(value.clone()),
            Err((status, message)) => Err(Error::UpstreamStatus {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

/// A format as the resolver reports it.
pub fn format(itag: u32, mime_type: &str, bitrate: Option<u64>, url: Option<&str>) -> StreamFormat {
    StreamFormat {
        itag: Some(itag),
        url: url.map(String::from),
        mime_type: Some(mime_type.to_string()),
        bitrate,
    }
}

/// A search result item shaped like the YouTube Music adapter's output.
pub fn song(video_id: &str, name: &str) -> Value {
    json!({
        "type": "SONG",
        "videoId": video_id,
        "name": name,
        "artist": {"artistId": "UC123", "name": "Test Artist"},
        "album": null,
        "duration": 215,
        "thumbnails": []
    })
}

/// State wired to default fakes.
pub fn test_state() -> AppState {
    state_with(
        Arc::new(FakeSearch::with_results(vec![song("dQw4w9WgXcQ", "Test Song")])),
        Arc::new(FakeResolver::default()),
        Arc::new(FakeUpstream::default()),
    )
}

pub fn state_with(
    search: Arc<dyn SongSearch>,
    resolver: Arc<dyn StreamResolver>,
    upstream: Arc<dyn MetadataUpstream>,
) -> AppState {
    AppState::from_components(search, resolver, upstream, TEST_DOCS_URL)
}


/// Collects formatted log lines emitted on the current thread.
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<parking_lot::Mutex<Vec<u8>>>);

impl LogCapture {
    /// Install a capturing subscriber as the thread default until the guard drops.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        (capture, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
