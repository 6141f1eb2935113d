//! YouTube Music search adapter.
//!
//! The YouTube Music web client talks to an internal "innertube" API. A
//! session needs the API key and client version that the web page embeds in
//! its `ytcfg.set({...})` bootstrap, so the client fetches the home page once
//! ([`SongSearch::initialize`]) and reuses the extracted configuration for
//! every search.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default web origin for YouTube Music.
pub const YTMUSIC_BASE_URL: &str = "https://music.youtube.com";

/// Innertube search `params` selecting the "Songs" filter.
const SONGS_FILTER: &str = "Eg-KAQwIARAAGAAgACgAMABqChAEEAMQCRAFEAo%3D";

/// Browser user agent; the home page omits `ytcfg` for unknown agents.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const SERVICE: &str = "YouTube Music";

/// Search capability exposed to the gateway.
///
/// `initialize` must be idempotent: it is called before every search and may
/// only perform work the first time it succeeds.
#[async_trait]
pub trait SongSearch: Send + Sync {
    /// Prepare the client for searching.
    async fn initialize(&self) -> Result<()>;

    /// Search songs matching `query`. Results are opaque JSON records.
    async fn search_songs(&self, query: &str) -> Result<Vec<Value>>;
}

/// Session configuration scraped from the web client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnertubeConfig {
    pub api_key: String,
    pub client_version: String,
    pub visitor_data: Option<String>,
}

impl InnertubeConfig {
    /// Extract the session configuration from the YouTube Music home page.
    pub fn from_html(html: &str) -> Result<Self> {
        let api_key = extract_ytcfg_string(html, "INNERTUBE_API_KEY")
            .ok_or_else(|| Error::Initialization("INNERTUBE_API_KEY not found".to_string()))?;
        let client_version = extract_ytcfg_string(html, "INNERTUBE_CLIENT_VERSION").ok_or_else(
            || Error::Initialization("INNERTUBE_CLIENT_VERSION not found".to_string()),
        )?;
        let visitor_data = extract_ytcfg_string(html, "VISITOR_DATA");

        Ok(Self {
            api_key,
            client_version,
            visitor_data,
        })
    }
}

fn extract_ytcfg_string(html: &str, key: &str) -> Option<String> {
    let marker = format!("\"{key}\":\"");
    let start = html.find(&marker)? + marker.len();
    let len = html[start..].find('"')?;
    let value = &html[start..start + len];
    (!value.is_empty()).then(|| value.to_string())
}

/// Options for [`YtMusicClient`].
#[derive(Debug, Clone)]
pub struct YtMusicOptions {
    /// Origin serving both the home page and `/youtubei/v1/*`.
    pub base_url: String,
    /// Interface language (`hl`).
    pub language: String,
    /// Content region (`gl`).
    pub region: String,
    pub timeout: Duration,
}

impl Default for YtMusicOptions {
    fn default() -> Self {
        Self {
            base_url: YTMUSIC_BASE_URL.to_string(),
            language: "en".to_string(),
            region: "US".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP-backed YouTube Music search client.
#[derive(Debug)]
pub struct YtMusicClient {
    http: Client,
    options: YtMusicOptions,
    config: OnceCell<InnertubeConfig>,
}

impl YtMusicClient {
    pub fn new(options: YtMusicOptions) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            http,
            options: YtMusicOptions {
                base_url: options.base_url.trim_end_matches('/').to_string(),
                ..options
            },
            config: OnceCell::new(),
        })
    }

    /// The session configuration, once initialized.
    pub fn config(&self) -> Option<&InnertubeConfig> {
        self.config.get()
    }

    async fn fetch_config(&self) -> Result<InnertubeConfig> {
        let url = format!("{}/", self.options.base_url);
        info!(url = %url, "initializing YouTube Music session");

        let response = self.http.get(&url).send().await?.error_for_status()?;
        let html = response.text().await?;
        let config = InnertubeConfig::from_html(&html)?;

        debug!(client_version = %config.client_version, "YouTube Music session ready");
        Ok(config)
    }

    async fn session(&self) -> Result<&InnertubeConfig> {
        self.config.get_or_try_init(|| self.fetch_config()).await
    }
}

#[async_trait]
impl SongSearch for YtMusicClient {
    async fn initialize(&self) -> Result<()> {
        self.session().await.map(|_| ())
    }

    async fn search_songs(&self, query: &str) -> Result<Vec<Value>> {
        let config = self.session().await?;
        let url = format!("{}/youtubei/v1/search", self.options.base_url);

        let body = json!({
            "context": {
                "client": {
                    "clientName": "WEB_REMIX",
                    "clientVersion": config.client_version,
                    "hl": self.options.language,
                    "gl": self.options.region,
                },
                "user": {},
            },
            "query": query,
            "params": SONGS_FILTER,
        });

        let mut request = self
            .http
            .post(&url)
            .query(&[("key", config.api_key.as_str()), ("prettyPrint", "false")])
            .json(&body);
        if let Some(visitor) = &config.visitor_data {
            request = request.header("X-Goog-Visitor-Id", visitor);
        }

        let response = request.send().await?.error_for_status()?;
        let payload: Value = response.json().await?;

        let songs = parse_song_results(&payload)?;
        debug!(query = %query, count = songs.len(), "YouTube Music search completed");

        songs
            .into_iter()
            .map(|song| serde_json::to_value(song).map_err(Error::from))
            .collect()
    }
}

/// A song entry from a YouTube Music search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongResult {
    #[serde(rename = "type")]
    pub kind: String,
    pub video_id: String,
    pub name: String,
    pub artist: ArtistRef,
    pub album: Option<AlbumRef>,
    /// Duration in seconds.
    pub duration: Option<u64>,
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRef {
    pub artist_id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRef {
    pub album_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

const SECTIONS_POINTER: &str =
    "/contents/tabbedSearchResultsRenderer/tabs/0/tabRenderer/content/sectionListRenderer/contents";

/// Parse an innertube search response into song results.
///
/// A response without the tabbed results layout is an error; a layout with no
/// music shelf simply has no results.
pub fn parse_song_results(payload: &Value) -> Result<Vec<SongResult>> {
    let sections = payload
        .pointer(SECTIONS_POINTER)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::UnexpectedResponse {
            service: SERVICE,
            message: "search response has no result sections".to_string(),
        })?;

    Ok(sections
        .iter()
        .filter_map(|section| section.pointer("/musicShelfRenderer/contents"))
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|item| item.get("musicResponsiveListItemRenderer"))
        .filter_map(parse_song)
        .collect())
}

fn flex_column(item: &Value, index: usize) -> Option<&Vec<Value>> {
    item.pointer(&format!(
        "/flexColumns/{index}/musicResponsiveListItemFlexColumnRenderer/text/runs"
    ))
    .and_then(Value::as_array)
}

fn browse_id(run: &Value) -> Option<&str> {
    run.pointer("/navigationEndpoint/browseEndpoint/browseId")
        .and_then(Value::as_str)
}

fn run_text(run: &Value) -> Option<&str> {
    run.get("text").and_then(Value::as_str)
}

fn parse_song(item: &Value) -> Option<SongResult> {
    let title_runs = flex_column(item, 0)?;
    let name = title_runs.first().and_then(run_text)?.to_string();

    let video_id = item
        .pointer("/playlistItemData/videoId")
        .or_else(|| {
            title_runs
                .first()
                .and_then(|run| run.pointer("/navigationEndpoint/watchEndpoint/videoId"))
        })
        .and_then(Value::as_str)?
        .to_string();

    let detail_runs: &[Value] = flex_column(item, 1).map(Vec::as_slice).unwrap_or(&[]);

    let artist = detail_runs
        .iter()
        .find(|run| browse_id(run).is_some_and(|id| id.starts_with("UC")))
        .and_then(|run| {
            Some(ArtistRef {
                artist_id: browse_id(run).map(str::to_string),
                name: run_text(run)?.to_string(),
            })
        })
        .or_else(|| {
            detail_runs.first().and_then(run_text).map(|name| ArtistRef {
                artist_id: None,
                name: name.to_string(),
            })
        })?;

    let album = detail_runs.iter().find_map(|run| {
        let id = browse_id(run).filter(|id| id.starts_with("MPREb_"))?;
        Some(AlbumRef {
            album_id: id.to_string(),
            name: run_text(run)?.to_string(),
        })
    });

    let duration = detail_runs.last().and_then(run_text).and_then(parse_duration);

    let thumbnails = item
        .pointer("/thumbnail/musicThumbnailRenderer/thumbnail/thumbnails")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();

    Some(SongResult {
        kind: "SONG".to_string(),
        video_id,
        name,
        artist,
        album,
        duration,
        thumbnails,
    })
}

/// Parse `m:ss` or `h:mm:ss` into seconds.
pub fn parse_duration(text: &str) -> Option<u64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    parts.iter().try_fold(0u64, |total, part| {
        let value: u64 = part.parse().ok()?;
        Some(total * 60 + value)
    })
}
