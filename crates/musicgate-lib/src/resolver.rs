//! YouTube stream resolution.
//!
//! Asks the innertube `player` endpoint for a video's streaming data and
//! returns every advertised format. Choosing among them is left to
//! [`crate::stream::select_best_audio`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};
use crate::stream::StreamFormat;

/// Default innertube origin for the player endpoint.
pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

// The Android client receives direct URLs for most formats, so no signature
// deciphering is needed.
const CLIENT_NAME: &str = "ANDROID";
const CLIENT_VERSION: &str = "19.09.37";
const ANDROID_SDK_VERSION: u32 = 30;
const USER_AGENT: &str = "com.google.android.youtube/19.09.37 (Linux; U; Android 11) gzip";

/// Stream resolution capability exposed to the gateway.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Fetch the full format list for `video_id`, in resolver order.
    async fn formats(&self, video_id: &str) -> Result<Vec<StreamFormat>>;
}

/// Check that `id` looks like a YouTube video id: 11 characters of
/// `[A-Za-z0-9_-]`.
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    streaming_data: Option<StreamingData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    formats: Vec<StreamFormat>,
    #[serde(default)]
    adaptive_formats: Vec<StreamFormat>,
}

/// Innertube-backed [`StreamResolver`].
#[derive(Debug, Clone)]
pub struct YoutubeResolver {
    http: Client,
    base_url: String,
    language: String,
    region: String,
}

impl YoutubeResolver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: "en".to_string(),
            region: "US".to_string(),
        })
    }

    /// Override the `hl`/`gl` pair sent with player requests.
    pub fn with_locale(mut self, language: impl Into<String>, region: impl Into<String>) -> Self {
        self.language = language.into();
        self.region = region.into();
        self
    }
}

#[async_trait]
impl StreamResolver for YoutubeResolver {
    async fn formats(&self, video_id: &str) -> Result<Vec<StreamFormat>> {
        if !is_valid_video_id(video_id) {
            return Err(Error::InvalidVideoId(video_id.to_string()));
        }

        let url = format!("{}/youtubei/v1/player", self.base_url);
        let body = json!({
            "videoId": video_id,
            "context": {
                "client": {
                    "clientName": CLIENT_NAME,
                    "clientVersion": CLIENT_VERSION,
                    "androidSdkVersion": ANDROID_SDK_VERSION,
                    "hl": self.language,
                    "gl": self.region,
                },
            },
            "contentCheckOk": true,
            "racyCheckOk": true,
        });

        let response = self
            .http
            .post(&url)
            .query(&[("prettyPrint", "false")])
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let player: PlayerResponse = response.json().await?;

        if let Some(playability) = &player.playability_status {
            if playability.status != "OK" {
                return Err(Error::Unplayable {
                    video_id: video_id.to_string(),
                    reason: playability
                        .reason
                        .clone()
                        .unwrap_or_else(|| playability.status.clone()),
                });
            }
        }

        let streaming = player.streaming_data.ok_or_else(|| Error::UnexpectedResponse {
            service: "YouTube player",
            message: format!("no streaming data for video {video_id}"),
        })?;

        let mut formats = streaming.formats;
        formats.extend(streaming.adaptive_formats);

        debug!(video_id = %video_id, count = formats.len(), "resolved stream formats");
        Ok(formats)
    }
}
